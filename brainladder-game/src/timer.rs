//! Cooperative countdown driven by the session owner.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::LOW_TIME_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownState {
    Running,
    Expired,
    Cancelled,
}

/// Result of advancing a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: Duration },
    /// Emitted once, on the tick that crosses zero.
    Expired,
    /// The countdown already expired or was cancelled.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    limit: Duration,
    remaining: Duration,
    state: CountdownState,
}

impl Countdown {
    #[must_use]
    pub const fn new(limit: Duration) -> Self {
        Self {
            limit,
            remaining: limit,
            state: CountdownState::Running,
        }
    }

    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.state = CountdownState::Expired;
            log::debug!("countdown of {:?} expired", self.limit);
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    /// Stop the countdown. Later ticks are no-ops.
    pub fn cancel(&mut self) {
        if self.state == CountdownState::Running {
            self.state = CountdownState::Cancelled;
        }
    }

    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    #[must_use]
    pub const fn state(&self) -> CountdownState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    /// True once the remaining time drops to the warning threshold.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.is_running() && self.remaining <= LOW_TIME_THRESHOLD
    }

    /// Whole seconds left, rounded up, as a display value.
    #[must_use]
    pub fn seconds_left(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}
