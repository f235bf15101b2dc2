//! Bar-state classification — the seven derived flags.
//!
//! Flags are never stored; they are a pure function of the execution
//! position and what the feed still has queued.

use crate::data::feed::FeedStatus;
use crate::engine::clock::ExecutionPosition;
use serde::{Deserialize, Serialize};

/// The seven bar-state flags observed by a handler on each update.
///
/// Invariants:
/// - `is_history` and `is_realtime` are mutually exclusive;
/// - `is_new` holds for every historical bar and only the first revision of
///   a realtime bar;
/// - `is_confirmed` holds for every historical bar and only the closing
///   revision of a realtime bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarState {
    pub is_first: bool,
    pub is_last: bool,
    pub is_history: bool,
    pub is_realtime: bool,
    pub is_new: bool,
    pub is_confirmed: bool,
    pub is_last_confirmed_history: bool,
}

/// Derive the flags for one position.
pub fn classify(position: &ExecutionPosition, status: &FeedStatus) -> BarState {
    let is_history = !position.is_realtime;
    let is_realtime = position.is_realtime;
    BarState {
        is_first: position.bar_index == 0,
        is_last: !status.more_events,
        is_history,
        is_realtime,
        is_new: is_history || position.update_count == 0,
        is_confirmed: is_history || position.closing,
        is_last_confirmed_history: is_history && !status.more_history,
    }
}
