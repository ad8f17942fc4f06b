// Cross-cutting prompt fragments shared by every LLM-backed feature.
// Feature-specific prompts live in a prompts.rs next to the feature.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the assistant on career topics and away from invented specifics.
pub const CAREER_SCOPE_INSTRUCTION: &str = "\
    Stay within career guidance: job search, resumes, interviews, skills, \
    compensation, career changes and workplace growth. \
    Do NOT invent statistics, salaries or company facts. \
    If a question is outside career guidance, say so briefly and steer back.";
