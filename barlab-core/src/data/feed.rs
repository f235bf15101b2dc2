//! Bar feeds — lazy, ordered event sources.

use crate::domain::{Bar, FeedEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// What the feed still has queued, as of the most recently delivered event.
///
/// The classifier consumes this: `more_events` drives `is_last`,
/// `more_history` drives `is_last_confirmed_history`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStatus {
    /// Further `NewHistoricalBar` events are queued.
    pub more_history: bool,
    /// Any further events are queued.
    pub more_events: bool,
    /// The feed will (or did) produce realtime events.
    pub market_open: bool,
}

/// An ordered, replayable-or-streamable source of feed events.
///
/// Finite for historical-only replay; may be unbounded for live use. The
/// runner pulls events one at a time and never looks ahead past `status`.
pub trait BarFeed {
    fn next_event(&mut self) -> Option<FeedEvent>;

    /// Queue state after the most recent `next_event`.
    fn status(&self) -> FeedStatus;
}

/// In-memory feed over a prebuilt event sequence.
#[derive(Debug)]
pub struct VecFeed {
    events: Vec<FeedEvent>,
    cursor: usize,
    remaining_history: usize,
    market_open: bool,
}

impl VecFeed {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        let remaining_history = events
            .iter()
            .filter(|e| matches!(e, FeedEvent::NewHistoricalBar(_)))
            .count();
        let market_open = events.iter().any(FeedEvent::is_realtime);
        Self {
            events,
            cursor: 0,
            remaining_history,
            market_open,
        }
    }

    /// Override the inferred market flag (e.g. an open market that produced
    /// no realtime events yet).
    pub fn with_market_open(mut self, market_open: bool) -> Self {
        self.market_open = market_open;
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl BarFeed for VecFeed {
    fn next_event(&mut self) -> Option<FeedEvent> {
        let event = self.events.get(self.cursor)?.clone();
        self.cursor += 1;
        if matches!(event, FeedEvent::NewHistoricalBar(_)) {
            self.remaining_history -= 1;
        }
        Some(event)
    }

    fn status(&self) -> FeedStatus {
        FeedStatus {
            more_history: self.remaining_history > 0,
            more_events: self.cursor < self.events.len(),
            market_open: self.market_open,
        }
    }
}

/// Expands a bar series into an event sequence.
///
/// The first `n - realtime_bars` bars become `NewHistoricalBar`; each
/// remaining bar becomes `updates_per_bar` partial revisions (progressively
/// extending toward the final values, deterministic per seed) followed by a
/// `RealtimeClose` carrying the exact bar.
#[derive(Debug, Clone)]
pub struct FeedBuilder {
    realtime_bars: usize,
    updates_per_bar: u32,
    seed: u64,
}

impl FeedBuilder {
    pub fn new() -> Self {
        Self {
            realtime_bars: 0,
            updates_per_bar: 4,
            seed: 7,
        }
    }

    /// How many trailing bars are delivered as realtime.
    pub fn realtime_bars(mut self, realtime_bars: usize) -> Self {
        self.realtime_bars = realtime_bars;
        self
    }

    /// Partial revisions per realtime bar, not counting the close.
    /// Clamped to at least one (a close needs a forming bar).
    pub fn updates_per_bar(mut self, updates_per_bar: u32) -> Self {
        self.updates_per_bar = updates_per_bar.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(&self, bars: Vec<Bar>) -> VecFeed {
        let split = bars.len().saturating_sub(self.realtime_bars);
        let mut events = Vec::new();

        for (i, bar) in bars.into_iter().enumerate() {
            if i < split {
                events.push(FeedEvent::NewHistoricalBar(bar));
            } else {
                let mut rng = StdRng::seed_from_u64(self.seed ^ bar.index);
                for k in 0..self.updates_per_bar {
                    events.push(FeedEvent::RealtimeUpdate(partial_revision(
                        &bar,
                        k,
                        self.updates_per_bar,
                        &mut rng,
                    )));
                }
                events.push(FeedEvent::RealtimeClose(bar));
            }
        }
        VecFeed::new(events)
    }
}

impl Default for FeedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A partial revision of `bar` at step `k` of `total`: the close walks from
/// open toward the final close with a little noise, high/low only as wide as
/// the walk has reached, volume pro-rated.
fn partial_revision(bar: &Bar, k: u32, total: u32, rng: &mut StdRng) -> Bar {
    let frac = (k + 1) as f64 / (total + 1) as f64;
    let range = (bar.high - bar.low).abs();
    let noise = if range > 0.0 {
        rng.gen_range(-0.1..0.1) * range
    } else {
        0.0
    };
    let close = (bar.open + (bar.close - bar.open) * frac + noise)
        .clamp(bar.low, bar.high);

    Bar {
        index: bar.index,
        open: bar.open,
        high: bar.open.max(close).min(bar.high),
        low: bar.open.min(close).max(bar.low),
        close,
        volume: bar.volume * frac,
        open_time: bar.open_time,
        close_time: bar.close_time,
    }
}
