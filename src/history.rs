use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::kv::KeyValueStore;

pub(crate) const HISTORY_KEY: &str = "moonplay_history";
pub(crate) const MAX_HISTORY_ITEMS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WatchHistoryEntry {
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) origin_name: String,
    pub(crate) thumb_url: String,
    pub(crate) episode_slug: String,
    pub(crate) episode_name: String,
    /// Epoch milliseconds.
    pub(crate) timestamp: i64,
}

impl WatchHistoryEntry {
    pub(crate) fn same_identity(&self, other: &WatchHistoryEntry) -> bool {
        self.slug == other.slug && self.episode_slug == other.episode_slug
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Capped, deduplicated, newest-first list of played episodes.
///
/// Storage faults never reach the caller: reads degrade to an empty list and
/// writes become logged no-ops.
pub(crate) struct WatchHistoryStore<S> {
    store: S,
}

impl<S: KeyValueStore> WatchHistoryStore<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &S {
        &self.store
    }

    pub(crate) fn record(&self, entry: WatchHistoryEntry) {
        let current = match self.store.get(HISTORY_KEY) {
            Ok(raw) => raw.map(|raw| decode_history(&raw)).unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "failed to load watch history; entry not recorded");
                return;
            }
        };

        let updated = insert_entry(current, entry);
        if let Err(err) = self.persist(&updated) {
            warn!(error = %err, "failed to save watch history");
        }
    }

    pub(crate) fn list(&self) -> Vec<WatchHistoryEntry> {
        match self.store.get(HISTORY_KEY) {
            Ok(Some(raw)) => decode_history(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to load watch history");
                Vec::new()
            }
        }
    }

    pub(crate) fn clear(&self) {
        if let Err(err) = self.store.remove(HISTORY_KEY) {
            warn!(error = %err, "failed to clear watch history");
        }
    }

    fn persist(&self, entries: &[WatchHistoryEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(HISTORY_KEY, &raw)
    }
}

pub(crate) fn insert_entry(
    mut entries: Vec<WatchHistoryEntry>,
    entry: WatchHistoryEntry,
) -> Vec<WatchHistoryEntry> {
    entries.retain(|item| !item.same_identity(&entry));
    entries.insert(0, entry);
    entries.truncate(MAX_HISTORY_ITEMS);
    entries
}

pub(crate) fn decode_history(raw: &str) -> Vec<WatchHistoryEntry> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "stored watch history is not valid JSON");
            return Vec::new();
        }
    };
    let Value::Array(items) = parsed else {
        warn!("stored watch history is not an array");
        return Vec::new();
    };

    let total = items.len();
    let entries: Vec<WatchHistoryEntry> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if entries.len() < total {
        debug!(
            skipped = total - entries.len(),
            "ignored malformed watch history element(s)"
        );
    }
    entries
}
