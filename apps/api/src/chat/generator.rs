//! Answer generation — the external text-generation collaborator behind the cache.
//!
//! `AppState` holds an `Arc<dyn AnswerGenerator>`; the default is `LlmAnswerGenerator`.
//! Tests swap in a canned generator.

use async_trait::async_trait;
use tracing::info;

use crate::chat::models::{ChatAnswer, ChatRequest, Role, UserProfile};
use crate::chat::prompts::{CHAT_PROMPT_TEMPLATE, CHAT_SYSTEM, NO_PROFILE};
use crate::errors::AppError;
use crate::llm_client::prompts::{CAREER_SCOPE_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, LlmMessage, MessageRole};

/// Most recent history turns forwarded to the model.
const MAX_HISTORY_TURNS: usize = 10;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: &ChatRequest) -> Result<ChatAnswer, AppError>;
}

pub struct LlmAnswerGenerator {
    llm: LlmClient,
    system: String,
}

impl LlmAnswerGenerator {
    pub fn new(llm: LlmClient) -> Self {
        let system = format!("{CHAT_SYSTEM}\n\n{CAREER_SCOPE_INSTRUCTION}\n\n{JSON_ONLY_SYSTEM}");
        Self { llm, system }
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, request: &ChatRequest) -> Result<ChatAnswer, AppError> {
        let messages = build_messages(request);

        let mut answer: ChatAnswer = self
            .llm
            .call_json(&self.system, &messages)
            .await
            .map_err(|e| AppError::Llm(format!("Chat generation failed: {e}")))?;

        if answer.response.trim().is_empty() {
            return Err(AppError::Llm("Model returned an empty answer".to_string()));
        }

        answer.confidence = if answer.confidence.is_finite() {
            answer.confidence.clamp(0.0, 1.0)
        } else {
            0.5
        };

        info!(
            "Generated answer: {} words, mood={:?}, confidence={:.2}",
            answer.response.split_whitespace().count(),
            answer.mood,
            answer.confidence
        );
        Ok(answer)
    }
}

/// Builds alternating turns ending with the templated user message.
/// Leading assistant turns are dropped; consecutive same-role turns are merged.
fn build_messages(request: &ChatRequest) -> Vec<LlmMessage> {
    let start = request
        .conversation_history
        .len()
        .saturating_sub(MAX_HISTORY_TURNS);

    let turns = request.conversation_history[start..]
        .iter()
        .skip_while(|turn| turn.role != Role::User)
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| match turn.role {
            Role::User => LlmMessage::user(turn.content.trim()),
            Role::Assistant => LlmMessage::assistant(turn.content.trim()),
        })
        .chain(std::iter::once(LlmMessage::user(render_prompt(request))));

    let mut messages: Vec<LlmMessage> = Vec::new();
    for turn in turns {
        match messages.last_mut() {
            Some(last) if last.role == turn.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&turn.content);
            }
            _ => messages.push(turn),
        }
    }
    debug_assert!(messages.first().map(|m| m.role) == Some(MessageRole::User));
    messages
}

fn render_prompt(request: &ChatRequest) -> String {
    let profile = request
        .user_profile
        .as_ref()
        .map(describe_profile)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| NO_PROFILE.to_string());

    CHAT_PROMPT_TEMPLATE
        .replace("{profile}", &profile)
        .replace("{message}", request.message.trim())
}

fn describe_profile(profile: &UserProfile) -> String {
    let mut lines = Vec::new();
    if let Some(name) = &profile.name {
        lines.push(format!("- Name: {name}"));
    }
    if let Some(role) = &profile.current_role {
        lines.push(format!("- Current role: {role}"));
    }
    if let Some(goals) = &profile.career_goals {
        lines.push(format!("- Career goals: {goals}"));
    }
    if !profile.skills.is_empty() {
        lines.push(format!("- Skills: {}", profile.skills.join(", ")));
    }
    if let Some(experience) = &profile.experience {
        lines.push(format!("- Experience: {experience}"));
    }
    lines.join("\n")
}
