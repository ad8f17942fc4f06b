use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::stream::StreamOptions;

// ────────────────────────────────────────────────────────────────────────────
// Inbound
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn of the conversation, as echoed back by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Caller context. Serialized verbatim into the cache key, so field order matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "current_role", skip_serializing_if = "Option::is_none")]
    pub current_role: Option<String>,
    #[serde(default, alias = "career_goals", skip_serializing_if = "Option::is_none")]
    pub career_goals: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
}

impl UserProfile {
    /// True when no field carries information.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Request body shared by the JSON and streaming chat endpoints.
/// Field names are camelCase on the wire; snake_case spellings are accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, alias = "conversation_history")]
    pub conversation_history: Vec<ChatTurn>,
    #[serde(default, alias = "user_profile")]
    pub user_profile: Option<UserProfile>,
    /// Only read by the streaming endpoint. Falls back to the configured defaults.
    #[serde(default, alias = "stream_options")]
    pub stream_options: Option<StreamOptions>,
}

// ────────────────────────────────────────────────────────────────────────────
// Answer payload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Encouraging,
    #[default]
    Friendly,
    Professional,
    Supportive,
    Excited,
    Thoughtful,
}

/// A complete assistant answer. Stored and replayed by the cache without inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub response: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, alias = "action_items")]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub mood: Mood,
    pub confidence: f64,
}

impl ChatAnswer {
    pub fn new(response: impl Into<String>, mood: Mood, confidence: f64) -> Self {
        Self {
            response: response.into(),
            suggestions: Vec::new(),
            action_items: Vec::new(),
            mood,
            confidence,
        }
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_action_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects answers that cannot be streamed faithfully.
    pub fn check_well_formed(&self) -> Result<(), String> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Answer confidence must be within [0, 1], got {}",
                self.confidence
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_defaults_optional_lists() {
        let json = r#"{"response": "Keep going", "mood": "encouraging", "confidence": 0.7}"#;
        let answer: ChatAnswer = serde_json::from_str(json).unwrap();
        assert!(answer.suggestions.is_empty());
        assert!(answer.action_items.is_empty());
        assert_eq!(answer.mood, Mood::Encouraging);
    }

    #[test]
    fn test_malformed_confidence_rejected() {
        assert!(ChatAnswer::new("x", Mood::Friendly, 1.5)
            .check_well_formed()
            .is_err());
        assert!(ChatAnswer::new("x", Mood::Friendly, f64::NAN)
            .check_well_formed()
            .is_err());
        assert!(ChatAnswer::new("x", Mood::Friendly, 0.0)
            .check_well_formed()
            .is_ok());
    }

    #[test]
    fn test_chat_request_minimal_body() {
        let request: ChatRequest =
            serde_json::from_value(serde_json::json!({ "message": "Hi" })).unwrap();
        assert!(request.conversation_history.is_empty());
        assert!(request.user_profile.is_none());
        assert!(request.stream_options.is_none());
    }

    #[test]
    fn test_profile_serialization_skips_empty_fields() {
        let profile = UserProfile {
            current_role: Some("Analyst".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&profile).unwrap(),
            r#"{"currentRole":"Analyst"}"#
        );
    }

    #[test]
    fn test_chat_request_camel_case_body() {
        let request: ChatRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "userProfile": { "currentRole": "Analyst", "careerGoals": "Data science" },
            "conversationHistory": [
                { "role": "user", "content": "Hello" },
                { "role": "assistant", "content": "Hi! How can I help?" }
            ],
            "streamOptions": { "chunkWordCount": 3, "typingEffectEnabled": false }
        }))
        .unwrap();

        let profile = request.user_profile.unwrap();
        assert_eq!(profile.current_role.as_deref(), Some("Analyst"));
        assert_eq!(profile.career_goals.as_deref(), Some("Data science"));
        assert_eq!(request.conversation_history.len(), 2);
        let options = request.stream_options.unwrap();
        assert_eq!(options.chunk_word_count, 3);
        assert!(!options.typing_effect_enabled);
        assert_eq!(options.inter_event_delay_ms, 50);
    }

    #[test]
    fn test_chat_request_accepts_snake_case_aliases() {
        let request: ChatRequest = serde_json::from_value(serde_json::json!({
            "message": "hi",
            "user_profile": { "current_role": "Analyst" },
            "conversation_history": [{ "role": "user", "content": "Hello" }]
        }))
        .unwrap();

        assert_eq!(
            request.user_profile.unwrap().current_role.as_deref(),
            Some("Analyst")
        );
        assert_eq!(request.conversation_history.len(), 1);
    }

    #[test]
    fn test_answer_action_items_wire_name() {
        let answer = ChatAnswer::new("x", Mood::Friendly, 0.5).with_action_items(["Apply"]);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["actionItems"][0], "Apply");

        let parsed: ChatAnswer = serde_json::from_value(serde_json::json!({
            "response": "x", "action_items": ["Apply"], "confidence": 0.5
        }))
        .unwrap();
        assert_eq!(parsed.action_items, vec!["Apply"]);
    }

    #[test]
    fn test_default_profile_is_empty() {
        assert!(UserProfile::default().is_empty());
        assert!(!UserProfile {
            skills: vec!["SQL".to_string()],
            ..Default::default()
        }
        .is_empty());
    }
}
