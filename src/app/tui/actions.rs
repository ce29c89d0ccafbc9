use std::collections::HashMap;

use ratatui::widgets::TableState;
use tracing::warn;

use crate::api::OphimClient;
use crate::db::Database;
use crate::history::{WatchHistoryEntry, WatchHistoryStore};

use super::DetailState;

pub(super) fn refresh_items(
    history: &WatchHistoryStore<Database>,
    items: &mut Vec<WatchHistoryEntry>,
    table_state: &mut TableState,
    preferred: Option<(&str, &str)>,
) {
    *items = history.list();
    if items.is_empty() {
        table_state.select(None);
        return;
    }

    if let Some((slug, episode_slug)) = preferred
        && let Some(idx) = items
            .iter()
            .position(|item| item.slug == slug && item.episode_slug == episode_slug)
    {
        table_state.select(Some(idx));
        return;
    }

    match table_state.selected() {
        Some(selected) => table_state.select(Some(selected.min(items.len() - 1))),
        None => table_state.select(Some(0)),
    }
}

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

/// Slug of the selected entry when its details have not been requested yet.
pub(super) fn missing_detail_slug(
    items: &[WatchHistoryEntry],
    table_state: &TableState,
    details_by_slug: &HashMap<String, DetailState>,
) -> Option<String> {
    let item = items.get(table_state.selected()?)?;
    (!details_by_slug.contains_key(&item.slug)).then(|| item.slug.clone())
}

pub(super) fn fetch_detail(api: &mut OphimClient, slug: &str) -> DetailState {
    match api.detail(slug) {
        Ok(detail) => DetailState::Ready(Box::new(detail)),
        Err(err) => {
            warn!(slug, error = %err, "failed to load movie details");
            DetailState::Failed(err.to_string())
        }
    }
}
