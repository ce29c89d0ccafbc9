use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

const MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum QueryKey {
    Latest { page: u32 },
    Detail { slug: String },
    Search { keyword: String, page: u32 },
    Genres,
    Countries,
    Category { slug: String, page: u32 },
}

impl QueryKey {
    pub(crate) fn stale_time(&self) -> Duration {
        match self {
            Self::Latest { .. } | Self::Category { .. } => 5 * MINUTE,
            Self::Detail { .. } => 10 * MINUTE,
            Self::Search { .. } => 3 * MINUTE,
            Self::Genres | Self::Countries => 30 * MINUTE,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedBody {
    body: String,
    fetched_at: Instant,
}

/// Response bodies keyed by query, with per-query freshness.
#[derive(Debug, Default)]
pub(crate) struct QueryCache {
    entries: HashMap<QueryKey, CachedBody>,
}

impl QueryCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fresh(&self, key: &QueryKey, now: Instant) -> Option<&str> {
        let cached = self.entries.get(key)?;
        let age = now.saturating_duration_since(cached.fetched_at);
        (age < key.stale_time()).then_some(cached.body.as_str())
    }

    pub(crate) fn store(&mut self, key: QueryKey, body: String, now: Instant) {
        self.entries.insert(
            key,
            CachedBody {
                body,
                fetched_at: now,
            },
        );
    }

    /// Serves a fresh body, otherwise fetches. Only bodies that `decode`
    /// accepts are stored; a failed refetch falls back to the stale body when
    /// one exists.
    pub(crate) fn get_or_fetch<T, E, F, D>(
        &mut self,
        key: QueryKey,
        now: Instant,
        fetch: F,
        decode: D,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<String, E>,
        D: Fn(&str) -> Result<T, E>,
        E: std::fmt::Display,
    {
        if let Some(body) = self.fresh(&key, now) {
            debug!(?key, "query cache hit");
            return decode(body);
        }

        let fetched = fetch().and_then(|body| {
            let value = decode(&body)?;
            Ok((body, value))
        });
        match fetched {
            Ok((body, value)) => {
                self.store(key, body, now);
                Ok(value)
            }
            Err(err) => match self.entries.get(&key) {
                Some(stale) => {
                    warn!(?key, error = %err, "refetch failed; serving stale response");
                    decode(&stale.body)
                }
                None => Err(err),
            },
        }
    }

    pub(crate) fn invalidate_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(body: &str) -> Result<String, String> {
        Ok(body.to_string())
    }

    fn number(body: &str) -> Result<u32, String> {
        body.parse().map_err(|_| format!("not a number: {body}"))
    }

    #[test]
    fn fresh_entry_skips_fetch() {
        let mut cache = QueryCache::new();
        let t0 = Instant::now();
        let key = QueryKey::Latest { page: 1 };
        let first = cache.get_or_fetch(key.clone(), t0, || Ok("one".to_string()), text);
        assert_eq!(first.as_deref(), Ok("one"));

        let second = cache.get_or_fetch(
            key,
            t0 + Duration::from_secs(60),
            || panic!("fresh entry must not refetch"),
            text,
        );
        assert_eq!(second.as_deref(), Ok("one"));
    }

    #[test]
    fn stale_entry_is_refetched() {
        let mut cache = QueryCache::new();
        let t0 = Instant::now();
        let key = QueryKey::Search {
            keyword: "naruto".to_string(),
            page: 1,
        };
        let _ = cache.get_or_fetch(key.clone(), t0, || Ok("old".to_string()), text);
        let later = t0 + key.stale_time();
        let refreshed = cache.get_or_fetch(key, later, || Ok("new".to_string()), text);
        assert_eq!(refreshed.as_deref(), Ok("new"));
    }

    #[test]
    fn failed_refetch_serves_stale_body() {
        let mut cache = QueryCache::new();
        let t0 = Instant::now();
        let key = QueryKey::Genres;
        let _ = cache.get_or_fetch(key.clone(), t0, || Ok("g".to_string()), text);
        let result = cache.get_or_fetch(
            key,
            t0 + Duration::from_secs(3600),
            || Err("offline".to_string()),
            text,
        );
        assert_eq!(result.as_deref(), Ok("g"));
    }

    #[test]
    fn failure_without_cached_body_is_returned() {
        let mut cache = QueryCache::new();
        let result = cache.get_or_fetch(
            QueryKey::Detail {
                slug: "x".to_string(),
            },
            Instant::now(),
            || Err("offline".to_string()),
            text,
        );
        assert_eq!(result, Err("offline".to_string()));
    }

    #[test]
    fn undecodable_body_is_not_cached() {
        let mut cache = QueryCache::new();
        let t0 = Instant::now();
        let key = QueryKey::Latest { page: 2 };

        let first = cache.get_or_fetch(key.clone(), t0, || Ok("<html>".to_string()), number);
        assert!(first.is_err());
        assert!(cache.fresh(&key, t0).is_none());

        let second = cache.get_or_fetch(key.clone(), t0, || Ok("7".to_string()), number);
        assert_eq!(second, Ok(7));

        let later = t0 + key.stale_time();
        let third = cache.get_or_fetch(key.clone(), later, || Ok("<html>".to_string()), number);
        assert_eq!(third, Ok(7));
        assert_eq!(cache.fresh(&key, t0), Some("7"));
    }

    #[test]
    fn stale_times_follow_query_kind() {
        assert_eq!(QueryKey::Genres.stale_time(), Duration::from_secs(1800));
        assert_eq!(
            QueryKey::Detail {
                slug: "a".to_string()
            }
            .stale_time(),
            Duration::from_secs(600)
        );
        let mut cache = QueryCache::new();
        cache.store(QueryKey::Countries, "c".to_string(), Instant::now());
        cache.invalidate_all();
        assert!(cache.fresh(&QueryKey::Countries, Instant::now()).is_none());
    }
}
