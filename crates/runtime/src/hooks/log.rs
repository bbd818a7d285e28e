//! Hook that keeps every command outcome for later inspection.
use std::sync::{Arc, Mutex, PoisonError};

use lockstep_core::{ActionKind, ExecutionHook, Frame, Owner};
use serde::Serialize;
use tracing::trace;

use super::SessionHook;

/// One executed command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub frame: Frame,
    pub owner: Owner,
    pub kind: ActionKind,
    pub success: bool,
}

/// Appends each outcome to a shared list. Clones share the list, so one copy
/// can be registered on a session while another is read.
#[derive(Clone, Debug, Default)]
pub struct ActionLog {
    records: Arc<Mutex<Vec<ActionRecord>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records so far.
    pub fn records(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the records so far.
    pub fn drain(&self) -> Vec<ActionRecord> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ExecutionHook for ActionLog {
    fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
        trace!(target: "lockstep::runtime", %frame, %owner, %kind, success, "command logged");
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ActionRecord {
                frame,
                owner,
                kind,
                success,
            });
    }
}

impl SessionHook for ActionLog {
    fn name(&self) -> &'static str {
        "action-log"
    }

    fn priority(&self) -> i32 {
        10
    }
}
