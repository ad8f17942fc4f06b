//! Stream delivery — replays a complete answer as an ordered event sequence.
//!
//! Event order per stream:
//!   start → content* → [suggestions] → [action_items] → complete
//! with `error` reachable from any non-terminal state. Nothing follows a terminal event.
//!
//! Generated answers are chunked by word count and paced to look typed. Cache hits
//! use the same event protocol but emit the whole text at once with no pacing.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::chat::models::{ChatAnswer, Mood};

/// Events buffered between the pacing task and the consumer.
const CHANNEL_CAPACITY: usize = 16;

const DEFAULT_CHUNK_WORDS: usize = 15;
const DEFAULT_DELAY_MS: u64 = 50;

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StreamEvent {
    Start,
    Content { text: String },
    Suggestions { items: Vec<String> },
    ActionItems { items: Vec<String> },
    Complete { mood: Mood, confidence: f64 },
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamOptions {
    #[serde(alias = "chunk_word_count")]
    pub chunk_word_count: usize,
    #[serde(alias = "inter_event_delay_ms")]
    pub inter_event_delay_ms: u64,
    #[serde(alias = "typing_effect_enabled")]
    pub typing_effect_enabled: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_word_count: DEFAULT_CHUNK_WORDS,
            inter_event_delay_ms: DEFAULT_DELAY_MS,
            typing_effect_enabled: true,
        }
    }
}

impl StreamOptions {
    fn pacing_delay(&self) -> Option<Duration> {
        (self.typing_effect_enabled && self.inter_event_delay_ms > 0)
            .then(|| Duration::from_millis(self.inter_event_delay_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Generated(StreamOptions),
    Cached,
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceState {
    NotStarted,
    Streaming { next_chunk: usize },
    Suggestions,
    ActionItems,
    Complete,
    Done,
}

/// Pull-based event source for a single answer. Not restartable.
#[derive(Debug)]
pub struct EventSequence {
    chunks: Vec<String>,
    suggestions: Vec<String>,
    action_items: Vec<String>,
    mood: Mood,
    confidence: f64,
    delay: Option<Duration>,
    state: SequenceState,
}

impl EventSequence {
    pub fn generated(answer: ChatAnswer, options: &StreamOptions) -> Result<Self, String> {
        let chunks = chunk_words(&answer.response, options.chunk_word_count);
        Self::build(answer, chunks, options.pacing_delay())
    }

    pub fn cached(answer: ChatAnswer) -> Result<Self, String> {
        let chunks = vec![answer.response.clone()];
        Self::build(answer, chunks, None)
    }

    fn build(
        answer: ChatAnswer,
        chunks: Vec<String>,
        delay: Option<Duration>,
    ) -> Result<Self, String> {
        answer.check_well_formed()?;
        Ok(Self {
            chunks,
            suggestions: answer.suggestions,
            action_items: answer.action_items,
            mood: answer.mood,
            confidence: answer.confidence,
            delay,
            state: SequenceState::NotStarted,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.state == SequenceState::Done
    }

    /// Pause owed before the next event. Only ever set between two content events.
    pub fn pending_delay(&self) -> Option<Duration> {
        match self.state {
            SequenceState::Streaming { next_chunk }
                if next_chunk > 0 && next_chunk < self.chunks.len() =>
            {
                self.delay
            }
            _ => None,
        }
    }

    pub fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.state {
                SequenceState::NotStarted => {
                    self.state = SequenceState::Streaming { next_chunk: 0 };
                    return Some(StreamEvent::Start);
                }
                SequenceState::Streaming { next_chunk } => {
                    if let Some(text) = self.chunks.get(next_chunk) {
                        let text = text.clone();
                        self.state = SequenceState::Streaming {
                            next_chunk: next_chunk + 1,
                        };
                        return Some(StreamEvent::Content { text });
                    }
                    self.state = SequenceState::Suggestions;
                }
                SequenceState::Suggestions => {
                    self.state = SequenceState::ActionItems;
                    if !self.suggestions.is_empty() {
                        return Some(StreamEvent::Suggestions {
                            items: std::mem::take(&mut self.suggestions),
                        });
                    }
                }
                SequenceState::ActionItems => {
                    self.state = SequenceState::Complete;
                    if !self.action_items.is_empty() {
                        return Some(StreamEvent::ActionItems {
                            items: std::mem::take(&mut self.action_items),
                        });
                    }
                }
                SequenceState::Complete => {
                    self.state = SequenceState::Done;
                    return Some(StreamEvent::Complete {
                        mood: self.mood,
                        confidence: self.confidence,
                    });
                }
                SequenceState::Done => return None,
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stream manager
// ────────────────────────────────────────────────────────────────────────────

pub type EventStream = BoxStream<'static, StreamEvent>;

/// Turns answers into paced event streams and SSE byte streams.
#[derive(Debug, Clone, Default)]
pub struct StreamManager {
    defaults: StreamOptions,
}

impl StreamManager {
    pub fn new(defaults: StreamOptions) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> StreamOptions {
        self.defaults
    }

    /// Chunked, paced replay. Must be called inside a Tokio runtime.
    pub fn stream_generated(
        &self,
        answer: ChatAnswer,
        options: Option<StreamOptions>,
        cancel: CancellationToken,
    ) -> EventStream {
        let options = options.unwrap_or(self.defaults);
        spawn_sequence(EventSequence::generated(answer, &options), cancel)
    }

    /// Single content event, no pacing.
    pub fn stream_cached(&self, answer: ChatAnswer, cancel: CancellationToken) -> EventStream {
        spawn_sequence(EventSequence::cached(answer), cancel)
    }

    /// Frames events as `data: <json>\n\n`. The returned stream ends after the terminal
    /// frame and cancels `cancel` when dropped, so a disconnecting client stops pacing.
    pub fn to_byte_stream(
        &self,
        answer: Result<ChatAnswer, String>,
        mode: StreamMode,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let guard = cancel.clone().drop_guard();

        let events = match answer {
            Ok(answer) => match mode {
                StreamMode::Generated(options) => {
                    self.stream_generated(answer, Some(options), cancel)
                }
                StreamMode::Cached => self.stream_cached(answer, cancel),
            },
            Err(message) => {
                warn!("Answer unavailable, streaming error frame: {message}");
                stream::iter([StreamEvent::Error { message }]).boxed()
            }
        };

        let state = FrameState {
            events,
            done: false,
            _guard: guard,
        };

        stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            let event = state.events.next().await?;
            let frame = match encode_frame(&event) {
                Ok(frame) => {
                    state.done = event.is_terminal();
                    frame
                }
                // Not expected for the current event payloads (non-finite floats encode
                // as `null`), but a frame that cannot be encoded still ends the stream.
                Err(e) => {
                    warn!("Failed to serialize stream event: {e}");
                    state.done = true;
                    error_frame(&format!("Failed to serialize stream event: {e}"))
                }
            };
            Some((Ok(frame), state))
        })
    }
}

struct FrameState {
    events: EventStream,
    done: bool,
    _guard: DropGuard,
}

fn spawn_sequence(
    sequence: Result<EventSequence, String>,
    cancel: CancellationToken,
) -> EventStream {
    let sequence = match sequence {
        Ok(sequence) => sequence,
        Err(message) => {
            warn!("Rejected malformed answer: {message}");
            return stream::iter([StreamEvent::Error { message }]).boxed();
        }
    };

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(pump(sequence, tx, cancel));

    stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((event, rx))
    })
    .boxed()
}

/// Drives the sequence into the channel, honouring pacing and cancellation.
async fn pump(
    mut sequence: EventSequence,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    while !sequence.is_finished() {
        if let Some(delay) = sequence.pending_delay() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Stream cancelled during pacing delay");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if cancel.is_cancelled() {
            debug!("Stream cancelled");
            return;
        }

        let Some(event) = sequence.next_event() else {
            return;
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = tx.send(event) => {
                if sent.is_err() {
                    debug!("Stream consumer dropped");
                    return;
                }
            }
        }
    }
}

fn encode_frame(event: &StreamEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

fn error_frame(message: &str) -> Bytes {
    let body = serde_json::json!({ "kind": "error", "message": message });
    Bytes::from(format!("data: {body}\n\n"))
}

// ────────────────────────────────────────────────────────────────────────────
// Pure helpers
// ────────────────────────────────────────────────────────────────────────────

/// Splits text on single spaces into groups of `words_per_chunk` words. Newlines and
/// extra spaces stay inside the chunks, so joining the chunks with `" "` restores the
/// text exactly. Whitespace-only text yields no chunks.
pub fn chunk_words(text: &str, words_per_chunk: usize) -> Vec<String> {
    let per_chunk = words_per_chunk.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut words = 0;

    for piece in text.split(' ') {
        let counts = is_word(piece);
        if counts && words == per_chunk {
            chunks.push(current.join(" "));
            current.clear();
            words = 0;
        }
        if counts {
            words += 1;
        }
        current.push(piece);
    }

    if words > 0 {
        chunks.push(current.join(" "));
    }
    chunks
}

/// `ceil(words / chunk_word_count) * inter_event_delay_ms`, saturating at `u64::MAX` ms.
pub fn estimate_duration(text: &str, options: &StreamOptions) -> Duration {
    let words = text.split(' ').filter(|piece| is_word(piece)).count() as u64;
    let chunks = words.div_ceil(options.chunk_word_count.max(1) as u64);
    Duration::from_millis(chunks.saturating_mul(options.inter_event_delay_ms))
}

fn is_word(piece: &str) -> bool {
    !piece.trim().is_empty()
}

/// Pacing tuned to answer length (in characters).
pub fn recommended_options(content_length: usize) -> StreamOptions {
    let (chunk_word_count, inter_event_delay_ms) = match content_length {
        0..=99 => (5, 30),
        100..=499 => (10, 40),
        _ => (20, 50),
    };
    StreamOptions {
        chunk_word_count,
        inter_event_delay_ms,
        typing_effect_enabled: true,
    }
}
