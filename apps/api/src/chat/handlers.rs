//! Axum route handlers for the Chat API.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chat::cache::{CacheHit, MatchKind};
use crate::chat::models::{ChatAnswer, ChatRequest};
use crate::chat::stream::{estimate_duration, recommended_options, StreamMode, StreamOptions};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: ChatAnswer,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<MatchKind>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub size: usize,
    pub max_entries: usize,
    pub hit_rate: f64,
    pub total_hits: u64,
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub text: String,
    #[serde(default)]
    pub options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub duration_ms: u64,
    pub options: StreamOptions,
}

enum AnswerSource {
    Cached(CacheHit),
    Generated(ChatAnswer),
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/chat
///
/// Returns the whole answer as JSON, from cache when possible.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate(&request)?;

    let response = match resolve_answer(&state, &request).await? {
        AnswerSource::Cached(hit) => ChatResponse {
            answer: hit.answer,
            cached: true,
            match_kind: Some(hit.match_kind),
        },
        AnswerSource::Generated(answer) => ChatResponse {
            answer,
            cached: false,
            match_kind: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/v1/chat/stream
///
/// Server-sent events. Cache hits stream instantly; fresh answers are paced.
/// Generation failures still return 200 with a single terminal `error` frame.
pub async fn handle_chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    validate(&request)?;

    let options = request
        .stream_options
        .unwrap_or_else(|| state.streams.defaults());

    let (answer, mode, cache_status) = match resolve_answer(&state, &request).await {
        Ok(AnswerSource::Cached(hit)) => (Ok(hit.answer), StreamMode::Cached, "hit"),
        Ok(AnswerSource::Generated(answer)) => {
            (Ok(answer), StreamMode::Generated(options), "miss")
        }
        Err(e) => {
            error!("Chat generation failed before streaming: {e}");
            (
                Err(e.public_message()),
                StreamMode::Generated(options),
                "miss",
            )
        }
    };

    let frames = state
        .streams
        .to_byte_stream(answer, mode, CancellationToken::new());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-cache"), cache_status),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}

/// POST /api/v1/chat/stream/estimate
///
/// Expected streaming time for a text, for client progress indicators.
pub async fn handle_estimate(Json(request): Json<EstimateRequest>) -> Json<EstimateResponse> {
    let options = request
        .options
        .unwrap_or_else(|| recommended_options(request.text.len()));
    let duration = estimate_duration(&request.text, &options);

    Json(EstimateResponse {
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        options,
    })
}

/// GET /api/v1/chat/cache/stats
pub async fn handle_cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.cache.stats();
    Json(CacheStatsResponse {
        size: stats.size,
        max_entries: state.config.cache_max_entries,
        hit_rate: stats.hit_rate,
        total_hits: stats.total_hits,
    })
}

/// DELETE /api/v1/chat/cache
pub async fn handle_clear_cache(State(state): State<AppState>) -> StatusCode {
    state.cache.clear();
    info!("Response cache cleared");
    StatusCode::NO_CONTENT
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn validate(request: &ChatRequest) -> Result<(), AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }
    Ok(())
}

/// Cache first, generator on miss. Only successful answers are cached.
async fn resolve_answer(
    state: &AppState,
    request: &ChatRequest,
) -> Result<AnswerSource, AppError> {
    let profile = request.user_profile.as_ref();

    if let Some(hit) = state.cache.get(&request.message, profile) {
        info!(
            "Serving cached answer ({:?}, hit_count={})",
            hit.match_kind, hit.hit_count
        );
        return Ok(AnswerSource::Cached(hit));
    }

    let answer = state.generator.generate(request).await?;
    state
        .cache
        .set(&request.message, answer.clone(), profile, None);

    Ok(AnswerSource::Generated(answer))
}
