//! Scoped variable store — transactional per-bar state for handlers.
//!
//! Each realtime bar is treated as an open transaction: every revision is a
//! savepoint that rolls back `Rolling` mutations from the prior revision,
//! and the closing revision is the commit. `Persistent` variables bypass the
//! transaction and survive re-entries of the same bar.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handler state values are arbitrary JSON.
pub type Value = serde_json::Value;

/// How a variable behaves across re-entries of the same bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarScope {
    /// Discarded on rollback; made permanent only by commit.
    Rolling,
    /// Applied immediately; survives rollback.
    Persistent,
}

/// The per-run variable store. Owned exclusively by the replay loop.
#[derive(Debug, Default)]
pub struct ScopedVars {
    persistent: HashMap<String, Value>,
    /// Rolling baseline as of the last commit.
    committed: HashMap<String, Value>,
    /// Rolling working copy for the revision in flight.
    working: HashMap<String, Value>,
}

impl ScopedVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable. A name lives in exactly one scope; re-declaring it
    /// with the other scope moves it.
    pub fn set(&mut self, name: impl Into<String>, scope: VarScope, value: Value) {
        let name = name.into();
        match scope {
            VarScope::Rolling => {
                self.persistent.remove(&name);
                self.working.insert(name, value);
            }
            VarScope::Persistent => {
                self.working.remove(&name);
                self.committed.remove(&name);
                self.persistent.insert(name, value);
            }
        }
    }

    /// Read a variable from either scope.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.working.get(name).or_else(|| self.persistent.get(name))
    }

    /// Discard rolling mutations since the last commit.
    pub fn rollback(&mut self) {
        self.working = self.committed.clone();
    }

    /// Make rolling mutations permanent.
    pub fn commit(&mut self) {
        self.committed = self.working.clone();
    }

    /// Number of live variables across both scopes.
    pub fn len(&self) -> usize {
        self.working.len() + self.persistent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rolling_var_rolls_back_to_committed_baseline() {
        let mut vars = ScopedVars::new();
        vars.set("last_close", VarScope::Rolling, json!(100.0));
        vars.commit();

        vars.set("last_close", VarScope::Rolling, json!(105.0));
        assert_eq!(vars.get("last_close"), Some(&json!(105.0)));

        vars.rollback();
        assert_eq!(vars.get("last_close"), Some(&json!(100.0)));
    }

    #[test]
    fn uncommitted_rolling_var_vanishes_on_rollback() {
        let mut vars = ScopedVars::new();
        vars.set("scratch", VarScope::Rolling, json!(1));
        vars.rollback();
        assert_eq!(vars.get("scratch"), None);
    }

    #[test]
    fn persistent_var_survives_rollback() {
        let mut vars = ScopedVars::new();
        vars.set("entry_seen", VarScope::Persistent, json!(true));
        vars.rollback();
        assert_eq!(vars.get("entry_seen"), Some(&json!(true)));
    }

    #[test]
    fn commit_makes_rolling_permanent() {
        let mut vars = ScopedVars::new();
        vars.set("hi", VarScope::Rolling, json!(42));
        vars.commit();
        vars.set("hi", VarScope::Rolling, json!(43));
        vars.rollback();
        assert_eq!(vars.get("hi"), Some(&json!(42)));
    }

    #[test]
    fn redeclaring_scope_moves_the_variable() {
        let mut vars = ScopedVars::new();
        vars.set("x", VarScope::Rolling, json!(1));
        vars.set("x", VarScope::Persistent, json!(2));
        vars.rollback();
        assert_eq!(vars.get("x"), Some(&json!(2)));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn rollback_then_reapply_is_idempotent() {
        // Simulates a duplicate tick: rollback + same mutation = same result.
        let mut vars = ScopedVars::new();
        vars.set("base", VarScope::Rolling, json!(10));
        vars.commit();

        vars.set("base", VarScope::Rolling, json!(20));
        let first = vars.get("base").cloned();

        vars.rollback();
        vars.set("base", VarScope::Rolling, json!(20));
        assert_eq!(vars.get("base").cloned(), first);
    }
}
