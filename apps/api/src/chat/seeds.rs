//! Built-in answers for the most common opening questions, preloaded at startup.

use crate::chat::cache::SeedEntry;
use crate::chat::models::{ChatAnswer, Mood};

pub fn default_seeds() -> Vec<SeedEntry> {
    vec![
        seed(
            "How do I negotiate my salary?",
            ChatAnswer::new(
                "Research the market range for your role and location before the conversation. \
                 Let the employer name a number first when you can, anchor your counter near the \
                 top of the range, and justify it with the impact you have delivered. Negotiate \
                 the whole package, including bonus, equity, leave and flexibility, not only base pay.",
                Mood::Encouraging,
                0.85,
            )
            .with_suggestions([
                "How do I research salary ranges?",
                "What if they say the budget is fixed?",
            ])
            .with_action_items([
                "Collect three salary data points for your role",
                "Write down your target number and walk-away number",
            ]),
        ),
        seed(
            "How can I improve my resume?",
            ChatAnswer::new(
                "Lead every bullet with a strong verb and a measurable outcome. Tailor the top \
                 third of the page to the role you want, cut anything older than ten years that \
                 does not support that target, and keep formatting simple so applicant tracking \
                 systems can parse it.",
                Mood::Professional,
                0.9,
            )
            .with_suggestions(["Can you review a resume bullet?"])
            .with_action_items(["Rewrite your top five bullets with numbers"]),
        ),
        seed(
            "How do I prepare for a job interview?",
            ChatAnswer::new(
                "Study the job description and map each requirement to a story from your \
                 experience. Prepare five or six stories in situation, task, action, result form, \
                 practise them out loud, and have two or three thoughtful questions ready about \
                 the team and its priorities.",
                Mood::Supportive,
                0.88,
            )
            .with_suggestions(["What are common behavioural questions?"])
            .with_action_items([
                "Draft five STAR stories",
                "Schedule a mock interview",
            ]),
        ),
        seed(
            "What skills are in demand right now?",
            ChatAnswer::new(
                "Data literacy, cloud fundamentals, automation and clear written communication \
                 are valued across most industries. The best choice for you depends on your \
                 field, so compare recent job postings for your target role and look for the \
                 skills that appear repeatedly.",
                Mood::Thoughtful,
                0.75,
            )
            .with_suggestions(["Which skills fit my current role?"]),
        ),
        seed(
            "How do I change careers?",
            ChatAnswer::new(
                "Start with the skills that transfer from your current work, then close the \
                 biggest gap with a small, visible project or course. Talk to people already in \
                 the target field, and look for bridge roles that use your existing experience \
                 while moving you toward the new direction.",
                Mood::Encouraging,
                0.8,
            )
            .with_action_items([
                "List your transferable skills",
                "Book two informational interviews",
            ]),
        ),
    ]
}

fn seed(message: &str, answer: ChatAnswer) -> SeedEntry {
    SeedEntry {
        message: message.to_string(),
        answer,
    }
}
