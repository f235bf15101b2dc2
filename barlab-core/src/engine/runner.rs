//! Script runner — the strictly sequential replay loop.
//!
//! Per event: advance the clock, classify, roll back per-bar state when
//! re-entering the same bar, invoke the handler, commit on confirmed
//! revisions. Exactly one event is in flight at a time; the handler
//! completes (including rollback bookkeeping) before the next event is
//! accepted.
//!
//! Failure semantics:
//! - malformed event ordering is always fatal;
//! - a handler fault on a historical bar halts the run (deterministic
//!   backtests);
//! - a handler fault on a realtime revision is logged and recorded, and the
//!   run continues with the next event. No failed invocation is retried.

use crate::data::feed::BarFeed;
use crate::domain::Bar;
use crate::engine::classifier::{classify, BarState};
use crate::engine::clock::{ExecutionClock, ExecutionPosition, SequenceError};
use crate::engine::handles::DrawingBoard;
use crate::engine::scope::ScopedVars;
use crate::fingerprint::{FeedFingerprint, FingerprintHasher};
use serde::Serialize;
use thiserror::Error;

/// A failure raised by the user handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Errors that abort a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("handler failed on historical bar {bar_index}: {source}")]
    HandlerFault {
        bar_index: u64,
        source: HandlerError,
    },
}

/// Mutable context a handler may touch during one invocation.
pub struct HandlerCtx<'a> {
    pub vars: &'a mut ScopedVars,
    pub drawings: &'a mut DrawingBoard,
}

/// User logic replayed once per feed event.
pub trait UpdateHandler {
    /// Stable name, folded into the replay fingerprint.
    fn name(&self) -> &str {
        "handler"
    }

    fn on_update(
        &mut self,
        bar: &Bar,
        state: &BarState,
        ctx: &mut HandlerCtx<'_>,
    ) -> Result<(), HandlerError>;
}

impl<F> UpdateHandler for F
where
    F: FnMut(&Bar, &BarState, &mut HandlerCtx<'_>) -> Result<(), HandlerError>,
{
    fn on_update(
        &mut self,
        bar: &Bar,
        state: &BarState,
        ctx: &mut HandlerCtx<'_>,
    ) -> Result<(), HandlerError> {
        self(bar, state, ctx)
    }
}

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Record a per-event `StateRecord` trace in the summary.
    pub record_trace: bool,
    /// Capacity of the drawing handle ring.
    pub max_drawings: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            record_trace: false,
            max_drawings: 50,
        }
    }
}

/// One recorded realtime handler fault.
#[derive(Debug, Clone, Serialize)]
pub struct FaultRecord {
    pub bar_index: u64,
    pub update_count: u32,
    pub closing: bool,
    pub message: String,
}

/// One entry of the optional per-event trace.
#[derive(Debug, Clone, Serialize)]
pub struct StateRecord {
    pub position: ExecutionPosition,
    pub state: BarState,
}

/// Result of a completed replay.
#[derive(Debug)]
pub struct RunSummary {
    /// Confirmed bars (historical + closed realtime).
    pub bar_count: u64,
    /// Total feed events processed.
    pub event_count: u64,
    /// `RealtimeUpdate` events processed.
    pub realtime_update_count: u64,
    /// Realtime bars that reached their close.
    pub realtime_bar_count: u64,
    /// Realtime handler faults, in order of occurrence.
    pub faults: Vec<FaultRecord>,
    /// Per-event trace; empty unless `RunnerConfig::record_trace`.
    pub trace: Vec<StateRecord>,
    /// Content hash of the consumed event sequence.
    pub feed_fingerprint: FeedFingerprint,
    /// Flags observed at the final event, if any event arrived.
    pub final_state: Option<BarState>,
    /// Whether the feed reported an open market.
    pub market_open: bool,
    pub drawings_committed: usize,
    pub drawings_evicted: u64,
}

/// The replay driver. Owns nothing between runs; all mutable run state
/// (clock, variables, drawings) lives inside `run`.
#[derive(Debug, Default)]
pub struct ScriptRunner {
    config: RunnerConfig,
}

impl ScriptRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Replay `feed` through `handler` to completion or fatal error.
    pub fn run(
        &self,
        feed: &mut dyn BarFeed,
        handler: &mut dyn UpdateHandler,
    ) -> Result<RunSummary, ReplayError> {
        let mut clock = ExecutionClock::new();
        let mut vars = ScopedVars::new();
        let mut board = DrawingBoard::new(self.config.max_drawings);
        let mut hasher = FingerprintHasher::new();

        let mut bar_count = 0u64;
        let mut event_count = 0u64;
        let mut realtime_update_count = 0u64;
        let mut realtime_bar_count = 0u64;
        let mut drawings_committed = 0usize;
        let mut faults = Vec::new();
        let mut trace = Vec::new();
        let mut final_state = None;
        let mut market_open = false;

        while let Some(event) = feed.next_event() {
            hasher.absorb(&event);
            let position = clock.advance(&event)?;
            let status = feed.status();
            let state = classify(&position, &status);
            event_count += 1;
            market_open = status.market_open;

            if position.is_realtime && !position.closing {
                realtime_update_count += 1;
            }

            // Re-entering the same bar: discard the prior revision's
            // rolling state before this one runs.
            if position.is_realtime && position.update_count > 0 {
                vars.rollback();
                board.discard_staged();
            }

            let bar = event.bar();
            let outcome = handler.on_update(
                bar,
                &state,
                &mut HandlerCtx {
                    vars: &mut vars,
                    drawings: &mut board,
                },
            );

            match outcome {
                Ok(()) => {
                    if state.is_confirmed {
                        vars.commit();
                        drawings_committed += board.commit_staged();
                        bar_count += 1;
                        if position.closing {
                            realtime_bar_count += 1;
                        }
                    }
                }
                Err(err) if state.is_history => {
                    return Err(ReplayError::HandlerFault {
                        bar_index: position.bar_index,
                        source: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        bar_index = position.bar_index,
                        update = position.update_count,
                        closing = position.closing,
                        error = %err,
                        "handler fault on realtime revision; continuing"
                    );
                    faults.push(FaultRecord {
                        bar_index: position.bar_index,
                        update_count: position.update_count,
                        closing: position.closing,
                        message: err.to_string(),
                    });
                    // The failed revision's mutations never land.
                    vars.rollback();
                    board.discard_staged();
                    if position.closing {
                        // The feed confirmed the bar regardless; it commits
                        // at the last good baseline.
                        bar_count += 1;
                        realtime_bar_count += 1;
                    }
                }
            }

            if self.config.record_trace {
                trace.push(StateRecord { position, state });
            }
            final_state = Some(state);
        }

        Ok(RunSummary {
            bar_count,
            event_count,
            realtime_update_count,
            realtime_bar_count,
            faults,
            trace,
            feed_fingerprint: hasher.finish(),
            final_state,
            market_open,
            drawings_committed,
            drawings_evicted: board.evicted_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feed::VecFeed;
    use crate::domain::{Bar, FeedEvent};
    use crate::engine::scope::VarScope;
    use chrono::NaiveDate;
    use serde_json::json;

    fn bar(index: u64) -> Bar {
        let date =
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(index as i64);
        Bar::daily(index, date, 100.0, 101.0, 99.0, 100.5, 1_000.0)
    }

    fn historical_feed(n: u64) -> VecFeed {
        VecFeed::new((0..n).map(|i| FeedEvent::NewHistoricalBar(bar(i))).collect())
    }

    /// Counts invocations; sets a persistent marker and a rolling scratch var.
    struct CountingHandler {
        calls: u64,
    }

    impl UpdateHandler for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        fn on_update(
            &mut self,
            bar: &Bar,
            _state: &BarState,
            ctx: &mut HandlerCtx<'_>,
        ) -> Result<(), HandlerError> {
            self.calls += 1;
            ctx.vars
                .set("last_index", VarScope::Persistent, json!(bar.index));
            ctx.vars
                .set("last_close", VarScope::Rolling, json!(bar.close));
            Ok(())
        }
    }

    #[test]
    fn handler_runs_once_per_event() {
        let runner = ScriptRunner::default();
        let mut handler = CountingHandler { calls: 0 };
        let summary = runner.run(&mut historical_feed(7), &mut handler).unwrap();

        assert_eq!(handler.calls, 7);
        assert_eq!(summary.event_count, 7);
        assert_eq!(summary.bar_count, 7);
        assert_eq!(summary.realtime_bar_count, 0);
        assert!(summary.faults.is_empty());
    }

    #[test]
    fn historical_fault_is_fatal_with_bar_index() {
        let runner = ScriptRunner::default();
        let mut handler = |bar: &Bar, _state: &BarState, _ctx: &mut HandlerCtx<'_>| {
            if bar.index == 2 {
                Err(HandlerError::new("boom"))
            } else {
                Ok(())
            }
        };

        let err = runner.run(&mut historical_feed(5), &mut handler).unwrap_err();
        match err {
            ReplayError::HandlerFault { bar_index, .. } => assert_eq!(bar_index, 2),
            other => panic!("expected handler fault, got {other:?}"),
        }
    }

    #[test]
    fn realtime_fault_is_recorded_and_run_continues() {
        let events = vec![
            FeedEvent::NewHistoricalBar(bar(0)),
            FeedEvent::RealtimeUpdate(bar(1)),
            FeedEvent::RealtimeUpdate(bar(1)),
            FeedEvent::RealtimeClose(bar(1)),
        ];
        let runner = ScriptRunner::default();
        let mut handler = |_bar: &Bar, state: &BarState, _ctx: &mut HandlerCtx<'_>| {
            if state.is_realtime && !state.is_confirmed {
                Err(HandlerError::new("transient"))
            } else {
                Ok(())
            }
        };

        let summary = runner.run(&mut VecFeed::new(events), &mut handler).unwrap();
        assert_eq!(summary.faults.len(), 2);
        assert_eq!(summary.bar_count, 2);
        assert_eq!(summary.realtime_bar_count, 1);
    }

    #[test]
    fn fault_on_close_commits_last_good_baseline() {
        let events = vec![
            FeedEvent::NewHistoricalBar(bar(0)),
            FeedEvent::RealtimeUpdate(bar(1)),
            FeedEvent::RealtimeClose(bar(1)),
        ];
        let runner = ScriptRunner::default();
        let mut handler = |_bar: &Bar, state: &BarState, ctx: &mut HandlerCtx<'_>| {
            ctx.vars.set(
                "marker",
                VarScope::Rolling,
                json!(if state.is_confirmed { "close" } else { "update" }),
            );
            if state.is_realtime && state.is_confirmed {
                Err(HandlerError::new("close fault"))
            } else {
                Ok(())
            }
        };

        let summary = runner.run(&mut VecFeed::new(events), &mut handler).unwrap();
        // Bar still counted as confirmed, fault recorded against the close.
        assert_eq!(summary.bar_count, 2);
        assert_eq!(summary.faults.len(), 1);
        assert!(summary.faults[0].closing);
    }

    #[test]
    fn staged_drawings_replaced_across_revisions() {
        let events = vec![
            FeedEvent::NewHistoricalBar(bar(0)),
            FeedEvent::RealtimeUpdate(bar(1)),
            FeedEvent::RealtimeUpdate(bar(1)),
            FeedEvent::RealtimeUpdate(bar(1)),
            FeedEvent::RealtimeClose(bar(1)),
        ];
        let runner = ScriptRunner::default();
        let mut handler = |bar: &Bar, _state: &BarState, ctx: &mut HandlerCtx<'_>| {
            ctx.drawings.place(crate::engine::handles::Drawing {
                label: "close marker".into(),
                bar_index: bar.index,
                value: bar.close,
            });
            Ok(())
        };

        let summary = runner.run(&mut VecFeed::new(events), &mut handler).unwrap();
        // One drawing per confirmed bar: the historical bar's, and only the
        // close revision's for the realtime bar.
        assert_eq!(summary.drawings_committed, 2);
        assert_eq!(summary.drawings_evicted, 0);
    }

    #[test]
    fn sequence_error_surfaces_from_run() {
        let events = vec![FeedEvent::RealtimeUpdate(bar(0))];
        let runner = ScriptRunner::default();
        let mut handler =
            |_: &Bar, _: &BarState, _: &mut HandlerCtx<'_>| Ok::<(), HandlerError>(());

        let err = runner.run(&mut VecFeed::new(events), &mut handler).unwrap_err();
        assert!(matches!(err, ReplayError::Sequence(_)));
    }

    #[test]
    fn trace_recorded_when_configured() {
        let runner = ScriptRunner::new(RunnerConfig {
            record_trace: true,
            ..Default::default()
        });
        let mut handler =
            |_: &Bar, _: &BarState, _: &mut HandlerCtx<'_>| Ok::<(), HandlerError>(());
        let summary = runner.run(&mut historical_feed(4), &mut handler).unwrap();

        assert_eq!(summary.trace.len(), 4);
        assert!(summary.trace[0].state.is_first);
        assert!(summary.trace[3].state.is_last);
    }

    #[test]
    fn identical_feeds_share_a_fingerprint() {
        let runner = ScriptRunner::default();
        let mut handler =
            |_: &Bar, _: &BarState, _: &mut HandlerCtx<'_>| Ok::<(), HandlerError>(());
        let a = runner.run(&mut historical_feed(5), &mut handler).unwrap();
        let b = runner.run(&mut historical_feed(5), &mut handler).unwrap();
        let c = runner.run(&mut historical_feed(6), &mut handler).unwrap();

        assert_eq!(a.feed_fingerprint, b.feed_fingerprint);
        assert_ne!(a.feed_fingerprint, c.feed_fingerprint);
    }
}
