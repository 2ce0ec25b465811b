//! One renderer per dashboard resource.
//!
//! Every panel shows whatever its cache entry holds, plus a notice line when
//! the entry is loading, refreshing or failed.

pub mod alerts;
pub mod reports;
pub mod stations;
pub mod weather;

use ratatui::text::{Line, Span};

use rivercache_core::cache::CacheEntry;

use super::styles;

/// Loading/refreshing/error line for an entry, if any applies.
pub fn entry_notice<T>(entry: &CacheEntry<T>) -> Option<Line<'static>> {
    if let Some(ref error) = entry.error {
        let prefix = if entry.data.is_some() {
            "⚠ Showing cached data: "
        } else {
            "⚠ "
        };
        return Some(Line::from(vec![
            Span::styled(format!("{}{}", prefix, error.summary()), styles::error_style()),
            Span::styled("  [r]etry", styles::help_key_style()),
        ]));
    }
    if entry.is_validating {
        let text = if entry.data.is_some() {
            "↻ Refreshing..."
        } else {
            "Loading..."
        };
        return Some(Line::from(Span::styled(text, styles::muted_style())));
    }
    None
}

/// " Title (5m ago) " for a panel border; `stale` marks data restored from
/// an old snapshot that no fetch has replaced yet.
pub fn panel_title<T>(title: &str, entry: &CacheEntry<T>, stale: bool) -> String {
    match entry.last_fetched_at {
        Some(_) if stale => format!(" {} (stale, {}) ", title, entry.age_display()),
        Some(_) => format!(" {} ({}) ", title, entry.age_display()),
        None => format!(" {} ", title),
    }
}
