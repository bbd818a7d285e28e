//! Session-level observers of executed commands.
//!
//! Hooks see each command's kind and success flag and are told when a frame
//! closes. They cannot change simulation state, so adding or removing one never
//! affects determinism.
//!
//! # Execution Order
//!
//! Hooks in a [`HookRegistry`] are sorted by priority (lower values run first).
//! Ties keep registration order.
mod apm;
mod log;

pub use apm::{ApmCounter, PlayerCounts};
pub use log::{ActionLog, ActionRecord};

use lockstep_core::{ActionKind, ExecutionHook, Frame, Owner};
use tracing::trace;

/// Observer registered on a session.
pub trait SessionHook: ExecutionHook + Send {
    /// Human-readable name used in logs and lookups.
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        0
    }

    /// Called once after every simulated frame.
    fn on_frame_end(&mut self, _frame: Frame) {}
}

/// Ordered set of session hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn SessionHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Box<dyn SessionHook>) {
        trace!(target: "lockstep::runtime", hook = hook.name(), "hook registered");
        self.hooks.push(hook);
        // Stable sort keeps registration order among equal priorities.
        self.hooks.sort_by_key(|hook| hook.priority());
    }

    pub fn find(&self, name: &str) -> Option<&dyn SessionHook> {
        self.hooks
            .iter()
            .find(|hook| hook.name() == name)
            .map(|hook| hook.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|hook| hook.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn frame_end(&mut self, frame: Frame) {
        for hook in &mut self.hooks {
            hook.on_frame_end(frame);
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.names())
            .finish()
    }
}

impl ExecutionHook for HookRegistry {
    fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
        for hook in &mut self.hooks {
            hook.on_action(frame, owner, kind, success);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Recorder {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ExecutionHook for Recorder {
        fn on_action(&mut self, _: Frame, _: Owner, _: ActionKind, _: bool) {
            self.log.lock().unwrap().push(self.name);
        }
    }

    impl SessionHook for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[test]
    fn hooks_run_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        for (name, priority) in [("late", 10), ("early", -5), ("default", 0)] {
            registry.register(Box::new(Recorder {
                name,
                priority,
                log: Arc::clone(&log),
            }));
        }

        registry.on_action(Frame(3), Owner(0), ActionKind::Stop, true);
        assert_eq!(*log.lock().unwrap(), vec!["early", "default", "late"]);
        assert!(registry.find("default").is_some());
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn frame_end_reaches_apm() {
        let mut registry = HookRegistry::new();
        registry.register(Box::new(ApmCounter::new()));
        registry.on_action(Frame(0), Owner(4), ActionKind::Stop, true);
        registry.frame_end(Frame(0));
        assert_eq!(registry.names(), vec!["apm"]);
    }
}
