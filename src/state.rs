//! Per-user conversation state.
//!
//! Each user has at most one pending mode deciding how their next free-text
//! message is read. No entry means the user is idle. State lives in memory
//! only and is lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// What the bot is waiting for from a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingMode {
    /// Next text is an ingredient list for a recipe.
    WaitingForRecipe,
    /// Next text is a journal note.
    WaitingForNote,
    /// Next text describes what led to a slip-up.
    WaitingForSlipAnalysis,
}

/// Single-slot state machine keyed by platform user id.
#[derive(Debug, Default)]
pub struct StateTracker {
    modes: Mutex<HashMap<i64, PendingMode>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn modes(&self) -> std::sync::MutexGuard<'_, HashMap<i64, PendingMode>> {
        // The map stays consistent even if a holder panicked.
        self.modes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter `mode`, replacing whatever was pending.
    pub fn set(&self, user_id: i64, mode: PendingMode) {
        self.modes().insert(user_id, mode);
    }

    pub fn get(&self, user_id: i64) -> Option<PendingMode> {
        self.modes().get(&user_id).copied()
    }

    /// Back to idle.
    pub fn clear(&self, user_id: i64) {
        self.modes().remove(&user_id);
    }

    /// Read and clear under one lock. A mode can be consumed at most once.
    pub fn take(&self, user_id: i64) -> Option<PendingMode> {
        self.modes().remove(&user_id)
    }
}
