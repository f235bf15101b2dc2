//! BarLab Core — bar-sequenced replay with realtime semantics.
//!
//! This crate contains the heart of the replay engine:
//! - Domain types (bars, feed events)
//! - Execution clock: the event-ordering state machine
//! - State classifier: the seven derived bar-state flags
//! - Scoped variable store with rollback/commit per realtime bar
//! - Drawing handle ring with bounded-count eviction
//! - Script runner: one handler invocation per event, strictly sequential
//! - Feed sources (in-memory, CSV, synthetic) and run fingerprinting

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync.
    ///
    /// The replay loop itself is single-threaded, but summaries and feeds
    /// routinely cross thread boundaries in drivers (worker threads, test
    /// harnesses). If any type fails this check, the build breaks here.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::FeedEvent>();
        require_sync::<domain::FeedEvent>();

        // Engine types
        require_send::<engine::ExecutionClock>();
        require_sync::<engine::ExecutionClock>();
        require_send::<engine::ExecutionPosition>();
        require_sync::<engine::ExecutionPosition>();
        require_send::<engine::BarState>();
        require_sync::<engine::BarState>();
        require_send::<engine::ScopedVars>();
        require_sync::<engine::ScopedVars>();
        require_send::<engine::DrawingBoard>();
        require_sync::<engine::DrawingBoard>();
        require_send::<engine::RunSummary>();
        require_sync::<engine::RunSummary>();
        require_send::<engine::ReplayError>();
        require_sync::<engine::ReplayError>();

        // Feed types
        require_send::<data::VecFeed>();
        require_sync::<data::VecFeed>();
        require_send::<data::FeedStatus>();
        require_sync::<data::FeedStatus>();

        // Identity types
        require_send::<fingerprint::FeedFingerprint>();
        require_sync::<fingerprint::FeedFingerprint>();
        require_send::<fingerprint::ReplayFingerprint>();
        require_sync::<fingerprint::ReplayFingerprint>();
    }
}
