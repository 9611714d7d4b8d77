//! Session Checkpointing
//!
//! The workflow snapshots the full session state after every phase so a
//! crashed or aborted session leaves its last consistent state behind.

use std::collections::HashMap;
use std::sync::RwLock;

use agent_core::error::Result;

use crate::state::SessionState;

/// Storage for per-session workflow snapshots, keyed by session id
pub trait CheckpointStore: Send + Sync {
    fn save(&self, state: &SessionState) -> Result<()>;
    fn load(&self, session_id: &str) -> Result<Option<SessionState>>;
    fn delete(&self, session_id: &str) -> Result<()>;
}

/// In-memory checkpoint store
#[derive(Default)]
pub struct MemoryCheckpointStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, state: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions.get(session_id).cloned())
    }

    fn delete(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(session_id);
        Ok(())
    }
}
