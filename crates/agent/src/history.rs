//! Conversation history window.

use unipath_core::domain::ChatTurn;

/// Turns kept from the client-submitted history.
pub const HISTORY_LIMIT: usize = 15;

/// The most recent `limit` turns; older turns drop off the front.
pub fn truncate_history(turns: &[ChatTurn], limit: usize) -> &[ChatTurn] {
    &turns[turns.len().saturating_sub(limit)..]
}
