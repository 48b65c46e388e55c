use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use serde_json::Value;

use crate::{config::CacheKeyFn, CacheConfig, EvaluationContext, EvaluationResponse};

/// Default cache key: MD5 of the context's canonical JSON form.
///
/// Object keys are sorted at every depth, so contexts that are structurally equal produce the
/// same key no matter how their maps were built.
pub fn default_cache_key(context: &EvaluationContext) -> String {
    let canonical = match serde_json::to_value(context) {
        Ok(value) => {
            let mut out = String::new();
            write_canonical(&value, &mut out);
            out
        }
        Err(err) => {
            log::warn!(target: "hyphen",
                       targeting_key:display = context.targeting_key;
                       "unable to serialize context for cache key, using targeting key: {:?}", err);
            context.targeting_key.clone()
        }
    };
    format!("{:x}", md5::compute(canonical))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

struct CacheEntry {
    response: Arc<EvaluationResponse>,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// `ResponseCache` maps evaluation contexts to evaluation responses for a fixed TTL.
///
/// It is safe to share between threads. Concurrent writers for the same key are last-write-wins.
pub struct ResponseCache {
    ttl: Duration,
    cache_key_fn: CacheKeyFn,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        ResponseCache {
            ttl: config.ttl,
            cache_key_fn: config.cache_key_fn,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Key under which responses for `context` are stored.
    pub fn generate_cache_key(&self, context: &EvaluationContext) -> String {
        (self.cache_key_fn)(context)
    }

    /// Cached response for `context`, unless there is none or it is older than the TTL.
    pub fn get(&self, context: &EvaluationContext) -> Option<Arc<EvaluationResponse>> {
        self.get_at(context, Instant::now())
    }

    /// Store `response` for `context`, replacing any previous entry and restarting its TTL.
    pub fn set(
        &self,
        context: &EvaluationContext,
        response: EvaluationResponse,
    ) -> Arc<EvaluationResponse> {
        self.set_at(context, response, Instant::now())
    }

    fn get_at(&self, context: &EvaluationContext, now: Instant) -> Option<Arc<EvaluationResponse>> {
        let key = self.generate_cache_key(context);
        // Err() is only possible if a writer panicked while holding the lock. Treat it as a miss
        // rather than crashing the app.
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&key)?;
        if entry.is_expired(self.ttl, now) {
            return None;
        }
        Some(entry.response.clone())
    }

    fn set_at(
        &self,
        context: &EvaluationContext,
        response: EvaluationResponse,
        now: Instant,
    ) -> Arc<EvaluationResponse> {
        let key = self.generate_cache_key(context);
        let response = Arc::new(response);
        let entry = CacheEntry {
            response: response.clone(),
            created_at: now,
        };

        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
            entries.insert(key, entry);
        }
        response
    }

    /// Number of stored entries, including expired ones not purged yet.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
