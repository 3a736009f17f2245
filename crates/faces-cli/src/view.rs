//! Terminal rendering of the card grid.

use std::time::Duration;

use faces_core::filter::{CardView, RenderSummary, ResultsMessage, NO_RESULTS_MESSAGE};
use faces_core::models::{CardHandle, ProfileRecord};

/// One row per card, shown or hidden and reordered by the filter engine.
pub struct TerminalView {
    rows: Vec<String>,
    visible: Vec<bool>,
    order: Vec<CardHandle>,
    summary: Option<RenderSummary>,
    alerts: Vec<String>,
    highlighted: Option<CardHandle>,
}

impl TerminalView {
    pub fn new(records: &[ProfileRecord]) -> Self {
        let mut rows = vec![String::new(); records.len()];
        for record in records {
            if let Some(row) = rows.get_mut(record.handle.0) {
                *row = format_row(record);
            }
        }
        Self {
            visible: vec![true; rows.len()],
            order: (0..rows.len()).map(CardHandle).collect(),
            rows,
            summary: None,
            alerts: Vec::new(),
            highlighted: None,
        }
    }

    /// Visible rows in display order
    pub fn visible_rows(&self) -> impl Iterator<Item = &str> + '_ {
        self.order
            .iter()
            .filter(|h| self.visible.get(h.0).copied().unwrap_or(false))
            .filter_map(|h| self.rows.get(h.0).map(String::as_str))
    }

    pub fn row(&self, handle: CardHandle) -> Option<&str> {
        self.rows.get(handle.0).map(String::as_str)
    }

    pub fn summary(&self) -> Option<&RenderSummary> {
        self.summary.as_ref()
    }

    /// Text for the results banner, if it should be shown
    pub fn results_line(&self) -> Option<String> {
        let summary = self.summary.as_ref()?;
        match summary.message {
            ResultsMessage::Hidden => None,
            ResultsMessage::ResultsFound => Some(summary.long_label()),
            ResultsMessage::NoResults => Some(NO_RESULTS_MESSAGE.to_string()),
        }
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn highlighted(&self) -> Option<CardHandle> {
        self.highlighted
    }
}

impl CardView for TerminalView {
    fn set_visible(&mut self, handle: CardHandle, visible: bool) {
        if let Some(v) = self.visible.get_mut(handle.0) {
            *v = visible;
        }
    }

    fn move_to_end(&mut self, handle: CardHandle) {
        self.order.retain(|h| *h != handle);
        self.order.push(handle);
    }

    fn publish_summary(&mut self, summary: &RenderSummary) {
        self.summary = Some(*summary);
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn clear_highlight(&mut self, handle: CardHandle) {
        if self.highlighted == Some(handle) {
            self.highlighted = None;
        }
    }

    // A terminal has nothing to animate; the highlight just marks the row.
    fn highlight(&mut self, handle: CardHandle, _clear_after: Duration) {
        self.highlighted = Some(handle);
    }
}

fn format_row(record: &ProfileRecord) -> String {
    format!(
        "{:<28} @{:<24} {:>12} followers {:>7} repos {:>8} forks {:>5} sponsors",
        truncate(&record.display_name, 28),
        truncate(&record.login, 24),
        faces_core::utils::format_number(Some(record.followers)),
        faces_core::utils::format_number(Some(record.repos)),
        faces_core::utils::format_number(Some(record.forks)),
        record.sponsors,
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
