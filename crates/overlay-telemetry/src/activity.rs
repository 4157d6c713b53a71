//! Active/idle tracking for polling loops.
//!
//! A loop polls quickly while the player is on track and slowly otherwise.
//! The edges between the two states drive session resets (on activation)
//! and deferred persistence (on deactivation).

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActivityState {
    #[default]
    Idle,
    Active,
}

impl ActivityState {
    pub fn is_active(&self) -> bool {
        matches!(self, ActivityState::Active)
    }
}

/// Edge reported when the tracked state flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityTransition {
    Activated,
    Deactivated,
}

#[derive(Debug, Default)]
pub struct ActivityTracker {
    state: ActivityState,
    activations: u64,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the latest "on track" reading and returns the edge, if any.
    pub fn update(&mut self, active: bool) -> Option<ActivityTransition> {
        let next = if active {
            ActivityState::Active
        } else {
            ActivityState::Idle
        };
        if next == self.state {
            return None;
        }

        debug!(previous = ?self.state, next = ?next, "Activity state changed");
        self.state = next;
        if active {
            self.activations = self.activations.saturating_add(1);
            Some(ActivityTransition::Activated)
        } else {
            Some(ActivityTransition::Deactivated)
        }
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    /// Number of idle-to-active edges seen so far.
    pub fn activations(&self) -> u64 {
        self.activations
    }
}
