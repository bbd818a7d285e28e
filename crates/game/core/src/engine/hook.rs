//! Observation hooks invoked after every executed command.
//!
//! Hooks see the command kind and its success flag; they cannot change
//! simulation state. Telemetry such as APM counters is built on this.

use crate::action::ActionKind;
use crate::state::{Frame, Owner};

/// Receives the outcome of each executed command.
pub trait ExecutionHook {
    fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool);
}

/// Hook that ignores every outcome.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHook;

impl ExecutionHook for NoopHook {
    fn on_action(&mut self, _frame: Frame, _owner: Owner, _kind: ActionKind, _success: bool) {}
}

/// Fans one outcome out to several hooks, in order.
impl<H: ExecutionHook> ExecutionHook for [H] {
    fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
        for hook in self {
            hook.on_action(frame, owner, kind, success);
        }
    }
}

impl<H: ExecutionHook + ?Sized> ExecutionHook for &mut H {
    fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
        (**self).on_action(frame, owner, kind, success);
    }
}
