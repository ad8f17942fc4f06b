/// Role description for the career assistant. Combined with the shared JSON and scope
/// fragments from `llm_client::prompts` at call time.
pub const CHAT_SYSTEM: &str = "You are a supportive, practical career guidance assistant. \
    Give specific, actionable advice tailored to the user's profile when one is provided.";

/// Wraps the latest user message. Placeholders: {profile}, {message}.
pub const CHAT_PROMPT_TEMPLATE: &str = r#"User profile:
{profile}

User message:
{message}

Respond with a JSON object of this exact shape:
{
  "response": "<the answer, plain prose>",
  "suggestions": ["<up to 3 short follow-up questions the user could ask>"],
  "actionItems": ["<up to 3 concrete next steps>"],
  "mood": "encouraging" | "friendly" | "professional" | "supportive" | "excited" | "thoughtful",
  "confidence": <number between 0 and 1>
}"#;

pub const NO_PROFILE: &str = "(not provided)";
