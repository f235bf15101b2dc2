//! Feed events — the single input alphabet of the replay loop.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// One update from a bar feed.
///
/// A feed delivers zero or more `NewHistoricalBar` events, then for each
/// forming bar a run of `RealtimeUpdate` revisions terminated by a
/// `RealtimeClose` carrying the final values. The execution clock rejects any
/// other ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedEvent {
    /// A finished, immutable bar.
    NewHistoricalBar(Bar),
    /// A revision of the currently forming bar.
    RealtimeUpdate(Bar),
    /// The final revision of the forming bar; commits it.
    RealtimeClose(Bar),
}

impl FeedEvent {
    /// The bar payload, whatever the event kind.
    pub fn bar(&self) -> &Bar {
        match self {
            FeedEvent::NewHistoricalBar(bar)
            | FeedEvent::RealtimeUpdate(bar)
            | FeedEvent::RealtimeClose(bar) => bar,
        }
    }

    /// True for `RealtimeUpdate` and `RealtimeClose`.
    pub fn is_realtime(&self) -> bool {
        !matches!(self, FeedEvent::NewHistoricalBar(_))
    }
}
