use std::sync::Arc;

use crate::chat::cache::ResponseCache;
use crate::chat::generator::AnswerGenerator;
use crate::chat::stream::StreamManager;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// One cache for the whole process. Created in `main`, disposed on shutdown.
    pub cache: Arc<ResponseCache>,
    /// Pluggable answer source. Default: LlmAnswerGenerator.
    pub generator: Arc<dyn AnswerGenerator>,
    pub streams: StreamManager,
}
