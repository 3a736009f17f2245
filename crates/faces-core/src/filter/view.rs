use std::time::Duration;

use crate::models::CardHandle;

/// How long a picked card stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_secs(2);

/// Banner text when nothing matches.
pub const NO_RESULTS_MESSAGE: &str = "No users match the current filters.";

/// Banner state shown above the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsMessage {
    /// Everything is visible, no banner
    Hidden,
    /// Some but not all cards are visible
    ResultsFound,
    /// Nothing matched
    NoResults,
}

impl ResultsMessage {
    pub fn from_counts(visible: usize, total: usize) -> Self {
        if visible == total {
            ResultsMessage::Hidden
        } else if visible == 0 {
            ResultsMessage::NoResults
        } else {
            ResultsMessage::ResultsFound
        }
    }
}

/// Counts published after every render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub visible: usize,
    pub total: usize,
    pub message: ResultsMessage,
}

impl RenderSummary {
    pub fn new(visible: usize, total: usize) -> Self {
        Self {
            visible,
            total,
            message: ResultsMessage::from_counts(visible, total),
        }
    }

    pub fn hidden(&self) -> usize {
        self.total - self.visible
    }

    /// Narrow-layout counter
    pub fn compact_label(&self) -> String {
        format!("{} / {}", self.visible, self.total)
    }

    /// Wide-layout counter
    pub fn long_label(&self) -> String {
        format!("Showing {} of {} users", self.visible, self.total)
    }
}

/// Presentation layer the engine drives. The engine never builds cards;
/// it only toggles, reorders and highlights the ones the view already owns.
pub trait CardView {
    fn set_visible(&mut self, handle: CardHandle, visible: bool);

    /// Move the card to the end of its container.
    fn move_to_end(&mut self, handle: CardHandle);

    fn publish_summary(&mut self, summary: &RenderSummary);

    /// User-facing notice.
    fn alert(&mut self, message: &str);

    fn scroll_into_view(&mut self, _handle: CardHandle) {}

    fn clear_highlight(&mut self, _handle: CardHandle) {}

    /// Mark the card highlighted; the view clears it after `clear_after`.
    fn highlight(&mut self, _handle: CardHandle, _clear_after: Duration) {}
}
