// tests/mod.rs
//! Test suite organization for context-sync
//!
//! Unit tests exercise single components without network access.
//! Integration tests run whole jobs against a local mock server and a
//! temporary workspace.


#[cfg(test)]
pub mod integration;

/// Common test utilities and helpers
#[cfg(test)]
pub mod common {
    use context_sync::{DataLayout, SyncContext, SyncState};
    use serde_json::Value;
    use std::path::Path;

    /// Creates a workspace with `state` written to `Sync/config.json`.
    pub fn workspace_with_state(root: &Path, state: Value) -> SyncContext {
        let layout = DataLayout::new(root);
        let state: SyncState = serde_json::from_value(state).expect("test state should parse");
        state
            .save(&layout.state_file())
            .expect("test state should save");
        SyncContext::load(layout).expect("test workspace should load")
    }

    pub fn read_json(path: &Path) -> Value {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("{} should exist: {}", path.display(), e));
        serde_json::from_str(&text).expect("output should be valid JSON")
    }

    pub fn read_state(root: &Path) -> Value {
        read_json(&DataLayout::new(root).state_file())
    }
}
