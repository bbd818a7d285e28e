//! Per-player action counters and rolling actions-per-minute.
use std::collections::{BTreeMap, VecDeque};

use lockstep_core::{ActionKind, CommandConfig, ExecutionHook, Frame, Owner};
use serde::{Deserialize, Serialize};

use super::SessionHook;

/// Counters for one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCounts {
    pub total: u64,
    pub succeeded: u64,
    pub by_kind: BTreeMap<ActionKind, u64>,
}

/// Counts every executed command per player and keeps a rolling window of
/// per-frame counts for an APM figure.
///
/// The window spans ten seconds of fastest-speed frames (42 ms each); the
/// figure is the window's mean scaled to a minute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApmCounter {
    players: Vec<PlayerCounts>,
    /// Commands per player in the frame being accumulated.
    current: Vec<u32>,
    /// Closed frames, oldest first.
    history: VecDeque<Vec<u32>>,
}

impl ApmCounter {
    pub const FRAME_MS: u64 = 42;
    pub const WINDOW_FRAMES: usize = (10_000 / Self::FRAME_MS) as usize;

    pub fn new() -> Self {
        Self {
            players: vec![PlayerCounts::default(); CommandConfig::MAX_PLAYERS],
            current: vec![0; CommandConfig::MAX_PLAYERS],
            history: VecDeque::with_capacity(Self::WINDOW_FRAMES),
        }
    }

    pub fn counts(&self, owner: Owner) -> Option<&PlayerCounts> {
        self.players.get(owner.index()?)
    }

    /// Closes the current frame into the rolling window.
    pub fn update(&mut self) {
        if self.history.len() == Self::WINDOW_FRAMES {
            self.history.pop_front();
        }
        let closed = std::mem::replace(&mut self.current, vec![0; CommandConfig::MAX_PLAYERS]);
        self.history.push_back(closed);
    }

    /// Actions per minute over the window; zero before the first frame closes.
    pub fn apm(&self, owner: Owner) -> u64 {
        let Some(index) = owner.index() else {
            return 0;
        };
        if self.history.is_empty() {
            return 0;
        }
        let sum: u64 = self.history.iter().map(|frame| frame[index] as u64).sum();
        sum * 60_000 / Self::FRAME_MS / self.history.len() as u64
    }
}

impl Default for ApmCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionHook for ApmCounter {
    fn on_action(&mut self, _frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
        let Some(index) = owner.index() else {
            return;
        };
        let counts = &mut self.players[index];
        counts.total += 1;
        if success {
            counts.succeeded += 1;
        }
        *counts.by_kind.entry(kind).or_default() += 1;
        self.current[index] = self.current[index].saturating_add(1);
    }
}

impl SessionHook for ApmCounter {
    fn name(&self) -> &'static str {
        "apm"
    }

    fn on_frame_end(&mut self, _frame: Frame) {
        self.update();
    }
}
