//! Execution clock — the event-ordering state machine.
//!
//! The clock consumes feed events one at a time and tracks the current
//! execution position: which bar index is active, whether the bar is
//! historical or realtime, and how many revisions the forming bar has
//! received. Malformed orderings are rejected with `SequenceError`.
//!
//! The clock is advanced synchronously by a single driver. It is not safe
//! for concurrent advancement from multiple callers.

use crate::domain::FeedEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from malformed event ordering. Always fatal to the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("realtime update at index {0} before any historical bar")]
    UpdateBeforeHistory(u64),

    #[error("historical bar {got} after realtime began at index {realtime_index}")]
    HistoryAfterRealtime { got: u64, realtime_index: u64 },

    #[error("historical bar index {got}, expected {expected}")]
    NonMonotonicHistory { expected: u64, got: u64 },

    #[error("realtime event index {got} does not match forming bar {expected}")]
    RealtimeIndexMismatch { expected: u64, got: u64 },

    #[error("realtime close at index {0} with no forming bar")]
    CloseWithoutForming(u64),

    #[error("second realtime close for bar {0}")]
    DuplicateClose(u64),
}

/// A snapshot of where execution stands after one event.
///
/// `update_count` is the zero-based ordinal of the event within its bar:
/// 0 for a historical bar or the first realtime revision, incrementing per
/// revision. The closing event carries the next ordinal with `closing` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPosition {
    pub bar_index: u64,
    pub is_realtime: bool,
    pub update_count: u32,
    pub closing: bool,
}

/// Where the clock stands between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No bars yet.
    Start,
    /// The bar at the current index is committed history.
    Historical,
    /// A realtime bar is forming at the current index.
    Forming { updates: u32, confirmed: bool },
}

/// The execution clock. One per run, advanced by the replay loop.
#[derive(Debug)]
pub struct ExecutionClock {
    index: u64,
    phase: Phase,
    /// Index of the first realtime bar, once the transition has happened.
    realtime_since: Option<u64>,
    last_position: Option<ExecutionPosition>,
}

impl ExecutionClock {
    pub fn new() -> Self {
        Self {
            index: 0,
            phase: Phase::Start,
            realtime_since: None,
            last_position: None,
        }
    }

    /// The position produced by the most recent `advance`, if any.
    pub fn position(&self) -> Option<ExecutionPosition> {
        self.last_position
    }

    /// True once the first realtime event has been accepted.
    pub fn realtime_started(&self) -> bool {
        self.realtime_since.is_some()
    }

    /// Advance the clock by one event, returning the new position.
    ///
    /// Bar index is non-decreasing across accepted events; the
    /// historical-to-realtime transition happens at most once per run.
    pub fn advance(&mut self, event: &FeedEvent) -> Result<ExecutionPosition, SequenceError> {
        let position = match event {
            FeedEvent::NewHistoricalBar(bar) => {
                if let Some(realtime_index) = self.realtime_since {
                    return Err(SequenceError::HistoryAfterRealtime {
                        got: bar.index,
                        realtime_index,
                    });
                }
                let expected = match self.phase {
                    Phase::Start => 0,
                    _ => self.index + 1,
                };
                if bar.index != expected {
                    return Err(SequenceError::NonMonotonicHistory {
                        expected,
                        got: bar.index,
                    });
                }
                self.index = bar.index;
                self.phase = Phase::Historical;
                ExecutionPosition {
                    bar_index: bar.index,
                    is_realtime: false,
                    update_count: 0,
                    closing: false,
                }
            }
            FeedEvent::RealtimeUpdate(bar) => match self.phase {
                Phase::Start => return Err(SequenceError::UpdateBeforeHistory(bar.index)),
                // A forming bar takes another revision.
                Phase::Forming {
                    updates,
                    confirmed: false,
                } => {
                    if bar.index != self.index {
                        return Err(SequenceError::RealtimeIndexMismatch {
                            expected: self.index,
                            got: bar.index,
                        });
                    }
                    self.phase = Phase::Forming {
                        updates: updates + 1,
                        confirmed: false,
                    };
                    ExecutionPosition {
                        bar_index: self.index,
                        is_realtime: true,
                        update_count: updates,
                        closing: false,
                    }
                }
                // Opens the next bar; the prior one (historical, or a closed
                // realtime bar) is thereby reclassified as history.
                Phase::Historical | Phase::Forming { confirmed: true, .. } => {
                    let expected = self.index + 1;
                    if bar.index != expected {
                        return Err(SequenceError::RealtimeIndexMismatch {
                            expected,
                            got: bar.index,
                        });
                    }
                    self.index = expected;
                    self.phase = Phase::Forming {
                        updates: 1,
                        confirmed: false,
                    };
                    self.realtime_since.get_or_insert(expected);
                    ExecutionPosition {
                        bar_index: expected,
                        is_realtime: true,
                        update_count: 0,
                        closing: false,
                    }
                }
            },
            FeedEvent::RealtimeClose(bar) => match self.phase {
                Phase::Forming {
                    updates,
                    confirmed: false,
                } => {
                    if bar.index != self.index {
                        return Err(SequenceError::RealtimeIndexMismatch {
                            expected: self.index,
                            got: bar.index,
                        });
                    }
                    self.phase = Phase::Forming {
                        updates,
                        confirmed: true,
                    };
                    ExecutionPosition {
                        bar_index: self.index,
                        is_realtime: true,
                        update_count: updates,
                        closing: true,
                    }
                }
                Phase::Forming {
                    confirmed: true, ..
                } => return Err(SequenceError::DuplicateClose(bar.index)),
                Phase::Start | Phase::Historical => {
                    return Err(SequenceError::CloseWithoutForming(bar.index))
                }
            },
        };

        self.last_position = Some(position);
        Ok(position)
    }
}

impl Default for ExecutionClock {
    fn default() -> Self {
        Self::new()
    }
}
