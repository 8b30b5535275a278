//! Steady-state liveness heartbeat.
//!
//! Once enumeration completes the foreground context does nothing but toggle
//! an indicator every [`HEARTBEAT_PERIOD`]. The toggle is the only externally
//! observable sign that bring-up succeeded; the loop owns the indicator
//! exclusively and must never hold off the interrupt tiers for longer than
//! the toggle itself.

use core::time::Duration;

/// Fixed suspend interval between indicator toggles.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(500);

/// Single-bit indicator output owned by the heartbeat loop.
pub trait Indicator {
    /// Inverts the indicator state.
    fn toggle(&mut self);
}

/// Per-iteration heartbeat bookkeeping.
#[derive(Copy, Clone, Debug, Default)]
pub struct Heartbeat {
    beats: u32,
}

impl Heartbeat {
    /// Creates a heartbeat that has not yet toggled.
    pub const fn new() -> Self {
        Self { beats: 0 }
    }

    /// Runs one iteration: toggle, then report how long to suspend.
    ///
    /// The caller performs the suspension with whatever timed-wait primitive
    /// its execution context provides; it must be a real suspension, not a
    /// busy wait, so the interrupt tiers stay serviceable.
    pub fn beat<I: Indicator>(&mut self, indicator: &mut I) -> Duration {
        indicator.toggle();
        self.beats = self.beats.saturating_add(1);
        HEARTBEAT_PERIOD
    }

    /// Number of toggles performed so far.
    pub const fn beats(&self) -> u32 {
        self.beats
    }
}
