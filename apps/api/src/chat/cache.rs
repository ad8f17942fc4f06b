//! Response cache — short-circuits answer generation for repeated or near-duplicate
//! questions.
//!
//! Lookup order on every `get`:
//! 1. purge expired entries
//! 2. exact key (normalized message + serialized profile)
//! 3. best token-overlap (Jaccard) match across all live entries, if it beats the
//!    configured threshold
//!
//! The similarity scan is linear in the number of entries. That is fine for the
//! configured capacity (low thousands) and is the scaling limit of this cache.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::chat::models::{ChatAnswer, UserProfile};

const DEFAULT_MAX_ENTRIES: usize = 1000;
const DEFAULT_TTL: Duration = Duration::from_secs(45 * 60);
const DEFAULT_PRELOAD_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Dropped before similarity scoring so rephrasings of the same question ("should I",
/// "do I need to") compare on their content words.
const STOP_WORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "did", "do", "does", "for", "from", "how", "i", "if", "in", "is", "it", "its",
    "me", "my", "need", "of", "on", "or", "should", "so", "that", "the", "this", "to",
    "was", "we", "were", "what", "which", "who", "will", "with", "would", "you", "your",
];

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl: Duration,
    pub preload_ttl: Duration,
    /// A similarity match must be strictly greater than this.
    pub similarity_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl: DEFAULT_TTL,
            preload_ttl: DEFAULT_PRELOAD_TTL,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Similar { score: f64 },
}

/// A successful lookup. `hit_count` already includes this read.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub answer: ChatAnswer,
    pub hit_count: u64,
    pub match_kind: MatchKind,
}

/// `hit_rate` is hits per stored entry, not the share of requests served from cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hit_rate: f64,
    pub total_hits: u64,
}

/// A known question/answer pair inserted at startup.
#[derive(Debug, Clone)]
pub struct SeedEntry {
    pub message: String,
    pub answer: ChatAnswer,
}

#[derive(Debug)]
struct CacheEntry {
    /// Normalized message without context, used for similarity.
    message: String,
    tokens: HashSet<String>,
    response: ChatAnswer,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order. Overwriting a key keeps its slot.
    order: VecDeque<String>,
}

impl CacheState {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
        before - self.entries.len()
    }

    /// Removes the entry with the oldest `created_at`; ties go to the earliest inserted.
    fn evict_oldest(&mut self) -> Option<String> {
        let mut oldest: Option<(usize, Instant)> = None;
        for (idx, key) in self.order.iter().enumerate() {
            let Some(entry) = self.entries.get(key) else {
                continue;
            };
            match oldest {
                Some((_, at)) if entry.created_at >= at => {}
                _ => oldest = Some((idx, entry.created_at)),
            }
        }

        let (idx, _) = oldest?;
        let key = self.order.remove(idx)?;
        self.entries.remove(&key);
        Some(key)
    }

    fn best_similar(&self, tokens: &HashSet<String>) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for key in &self.order {
            let Some(entry) = self.entries.get(key) else {
                continue;
            };
            let score = jaccard(tokens, &entry.tokens);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((key.as_str(), score)),
            }
        }
        best
    }
}

/// Process-wide answer cache. Construct once at startup and share through `AppState`.
#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn shared(config: CacheConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn get(&self, message: &str, context: Option<&UserProfile>) -> Option<CacheHit> {
        let now = Instant::now();
        let mut state = self.state.lock();

        let purged = state.purge_expired(now);
        if purged > 0 {
            debug!("Purged {purged} expired cache entries");
        }

        let key = cache_key(message, context);
        if let Some(entry) = state.entries.get_mut(&key) {
            if entry.is_live(now) {
                entry.hit_count += 1;
                debug!("Cache hit (exact), hit_count={}", entry.hit_count);
                return Some(CacheHit {
                    answer: entry.response.clone(),
                    hit_count: entry.hit_count,
                    match_kind: MatchKind::Exact,
                });
            }
        }

        let tokens = tokenize(message);
        let (best_key, score) = match state.best_similar(&tokens) {
            Some((best_key, score)) if score > self.config.similarity_threshold => {
                (best_key.to_string(), score)
            }
            _ => {
                debug!("Cache miss");
                return None;
            }
        };

        let entry = state.entries.get_mut(&best_key)?;
        entry.hit_count += 1;
        debug!(
            "Cache hit (similar {score:.2} to {:?}), hit_count={}",
            entry.message, entry.hit_count
        );
        Some(CacheHit {
            answer: entry.response.clone(),
            hit_count: entry.hit_count,
            match_kind: MatchKind::Similar { score },
        })
    }

    pub fn set(
        &self,
        message: &str,
        answer: ChatAnswer,
        context: Option<&UserProfile>,
        ttl: Option<Duration>,
    ) {
        let key = cache_key(message, context);
        let entry = CacheEntry {
            message: normalize(message),
            tokens: tokenize(message),
            response: answer,
            created_at: Instant::now(),
            ttl: ttl.unwrap_or(self.config.default_ttl),
            hit_count: 0,
        };

        let mut state = self.state.lock();
        if state.entries.len() >= self.config.max_entries {
            if let Some(evicted) = state.evict_oldest() {
                debug!("Cache at capacity, evicted {evicted:?}");
            }
        }

        if state.entries.insert(key.clone(), entry).is_none() {
            state.order.push_back(key);
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let size = state.entries.len();
        let total_hits: u64 = state.entries.values().map(|e| e.hit_count).sum();
        let hit_rate = if size > 0 {
            total_hits as f64 / size as f64
        } else {
            0.0
        };
        CacheStats {
            size,
            hit_rate,
            total_hits,
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Seeds the cache with common questions using the longer preload TTL.
    pub fn preload(&self, seeds: &[SeedEntry]) {
        for seed in seeds {
            self.set(
                &seed.message,
                seed.answer.clone(),
                None,
                Some(self.config.preload_ttl),
            );
        }
        info!("Preloaded {} cache entries", seeds.len());
    }

    /// Called once at shutdown. Logs final stats and drops all entries.
    pub fn dispose(&self) {
        let stats = self.stats();
        info!(
            "Disposing response cache: size={} total_hits={} hit_rate={:.2}",
            stats.size, stats.total_hits, stats.hit_rate
        );
        self.clear();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Key + similarity helpers
// ────────────────────────────────────────────────────────────────────────────

fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}

/// An all-empty profile keys the same as no profile.
fn cache_key(message: &str, context: Option<&UserProfile>) -> String {
    let context = context
        .filter(|profile| !profile.is_empty())
        .map(|profile| serde_json::to_string(profile).unwrap_or_default())
        .unwrap_or_default();
    format!("{}::{}", normalize(message), context)
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Token-set Jaccard similarity between two messages, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::models::Mood;

    fn answer(text: &str) -> ChatAnswer {
        ChatAnswer::new(text, Mood::Encouraging, 0.9)
    }

    fn cache_with(config: CacheConfig) -> ResponseCache {
        ResponseCache::new(config)
    }

    #[test]
    fn test_miss_then_case_insensitive_hit() {
        let cache = cache_with(CacheConfig::default());
        assert!(cache.get("How do I negotiate salary?", None).is_none());

        cache.set("How do I negotiate salary?", answer("Anchor high."), None, None);

        let hit = cache.get("how do I negotiate salary?", None).unwrap();
        assert_eq!(hit.answer.response, "Anchor high.");
        assert_eq!(hit.answer.mood, Mood::Encouraging);
        assert_eq!(hit.hit_count, 1);
        assert_eq!(hit.match_kind, MatchKind::Exact);
    }

    #[test]
    fn test_exact_match_respects_context() {
        let cache = cache_with(CacheConfig::default());
        let profile = UserProfile {
            current_role: Some("Data Analyst".to_string()),
            ..Default::default()
        };
        cache.set("  Should I learn SQL?  ", answer("Yes."), Some(&profile), None);

        let hit = cache.get("should i learn sql?", Some(&profile)).unwrap();
        assert_eq!(hit.match_kind, MatchKind::Exact);

        // Same text without the profile falls through to similarity matching.
        let hit = cache.get("should i learn sql?", None).unwrap();
        assert!(matches!(hit.match_kind, MatchKind::Similar { .. }));
        assert_eq!(hit.hit_count, 2);
    }

    #[test]
    fn test_empty_profile_keys_like_no_profile() {
        let cache = cache_with(CacheConfig::default());
        cache.set("Should I learn SQL?", answer("Yes."), None, None);

        let hit = cache
            .get("should i learn sql?", Some(&UserProfile::default()))
            .unwrap();
        assert_eq!(hit.match_kind, MatchKind::Exact);
        assert_eq!(
            cache_key("x", Some(&UserProfile::default())),
            cache_key("x", None)
        );
    }

    #[test]
    fn test_near_duplicate_question_matches() {
        let cache = cache_with(CacheConfig::default());
        cache.set(
            "What skills should I learn next?",
            answer("Cloud and data."),
            None,
            None,
        );

        let hit = cache.get("What skills do I need to learn next", None).unwrap();
        assert_eq!(hit.answer.response, "Cloud and data.");
        assert!(matches!(hit.match_kind, MatchKind::Similar { .. }));
    }

    #[test]
    fn test_similarity_at_threshold_is_not_a_match() {
        let cache = cache_with(CacheConfig::default());
        cache.set(
            "interview preparation resume portfolio",
            answer("Prep."),
            None,
            None,
        );

        let query = "interview preparation resume portfolio networking";
        assert_eq!(
            similarity(query, "interview preparation resume portfolio"),
            0.8
        );
        assert!(cache.get(query, None).is_none());
    }

    #[test]
    fn test_similarity_just_above_threshold_matches() {
        let cache = cache_with(CacheConfig::default());
        cache.set(
            "interview preparation resume portfolio networking",
            answer("Prep."),
            None,
            None,
        );

        let hit = cache
            .get(
                "interview preparation resume portfolio networking mentorship",
                None,
            )
            .unwrap();
        match hit.match_kind {
            MatchKind::Similar { score } => assert!(score > 0.8),
            MatchKind::Exact => panic!("expected a similarity match"),
        }
    }

    #[test]
    fn test_similarity_tie_prefers_first_inserted() {
        let cache = cache_with(CacheConfig {
            similarity_threshold: 0.3,
            ..Default::default()
        });
        cache.set("product manager roadmap", answer("first"), None, None);
        cache.set("product manager stakeholders", answer("second"), None, None);

        let hit = cache.get("product manager", None).unwrap();
        assert_eq!(hit.answer.response, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_boundary() {
        let cache = cache_with(CacheConfig::default());
        cache.set(
            "remote work tips",
            answer("Set boundaries."),
            None,
            Some(Duration::from_secs(10)),
        );

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(cache.get("remote work tips", None).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get("remote work tips", None).is_none());
        assert_eq!(cache.stats().size, 0, "expired entry should be purged on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_is_45_minutes() {
        let cache = cache_with(CacheConfig::default());
        cache.set("career change at forty", answer("Possible."), None, None);

        tokio::time::advance(Duration::from_secs(44 * 60)).await;
        assert!(cache.get("career change at forty", None).is_some());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.get("career change at forty", None).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest_entry() {
        let cache = cache_with(CacheConfig {
            max_entries: 3,
            ..Default::default()
        });
        cache.set("alpha question", answer("a"), None, None);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("bravo topic", answer("b"), None, None);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set("charlie subject", answer("c"), None, None);
        tokio::time::advance(Duration::from_secs(1)).await;

        cache.set("delta matter", answer("d"), None, None);

        assert_eq!(cache.stats().size, 3);
        assert!(cache.get("alpha question", None).is_none());
        assert!(cache.get("bravo topic", None).is_some());
        assert!(cache.get("delta matter", None).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_tie_removes_first_inserted() {
        let cache = cache_with(CacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        cache.set("alpha question", answer("a"), None, None);
        cache.set("bravo topic", answer("b"), None, None);
        cache.set("charlie subject", answer("c"), None, None);

        assert_eq!(cache.stats().size, 2);
        assert!(cache.get("alpha question", None).is_none());
        assert!(cache.get("bravo topic", None).is_some());
    }

    #[test]
    fn test_stats_hits_per_entry() {
        let cache = cache_with(CacheConfig::default());
        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 0,
                hit_rate: 0.0,
                total_hits: 0
            }
        );

        cache.set("alpha question", answer("a"), None, None);
        cache.set("bravo topic", answer("b"), None, None);
        cache.get("alpha question", None);
        cache.get("alpha question", None);
        cache.get("bravo topic", None);

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.hit_rate, 1.5);
    }

    #[test]
    fn test_clear_and_preload() {
        let cache = cache_with(CacheConfig::default());
        cache.set("alpha question", answer("a"), None, None);
        cache.clear();
        assert_eq!(cache.stats().size, 0);

        cache.preload(&[SeedEntry {
            message: "How do I write a resume?".to_string(),
            answer: answer("Lead with impact."),
        }]);
        assert_eq!(cache.stats().size, 1);
        assert!(cache.get("how do i write a resume?", None).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preload_uses_extended_ttl() {
        let cache = cache_with(CacheConfig::default());
        cache.preload(&[SeedEntry {
            message: "How do I write a resume?".to_string(),
            answer: answer("Lead with impact."),
        }]);

        tokio::time::advance(Duration::from_secs(50 * 60)).await;
        assert!(cache.get("How do I write a resume?", None).is_some());

        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        assert!(cache.get("How do I write a resume?", None).is_none());
    }

    #[test]
    fn test_similarity_of_empty_token_sets_is_zero() {
        assert_eq!(similarity("", "   "), 0.0);
        assert_eq!(similarity("what is it", "how do i"), 0.0);
    }

    #[test]
    fn test_tokenize_strips_punctuation_and_stop_words() {
        let tokens = tokenize("What skills should I learn, next?");
        let expected: HashSet<String> = ["skills", "learn", "next"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tokens, expected);
    }
}
