#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics mirror the bring-up phase and the measured rail so a
//! debugger (or a future diagnostic surface) can read them without touching
//! shared mutable state directly.

use bringup_core::bringup::BringupPhase;
use portable_atomic::{AtomicU8, AtomicU32, Ordering};

const UNKNOWN_RAIL: u32 = 0;

/// Millivolt reading captured from the VDD rail (0 == not yet measured).
static RAIL_MV: AtomicU32 = AtomicU32::new(UNKNOWN_RAIL);
/// Encoded [`BringupPhase`] the sequence last reached.
static PHASE: AtomicU8 = AtomicU8::new(BringupPhase::Idle.as_u8());

/// Stores the one-shot rail measurement.
pub fn record_rail(millivolts: u32) {
    RAIL_MV.store(millivolts, Ordering::Relaxed);
}

/// Returns the measured rail, if the probe has run.
pub fn rail_millivolts() -> Option<u32> {
    match RAIL_MV.load(Ordering::Relaxed) {
        UNKNOWN_RAIL => None,
        value => Some(value),
    }
}

/// Mirrors the current bring-up phase.
pub fn record_phase(phase: BringupPhase) {
    PHASE.store(phase.as_u8(), Ordering::Relaxed);
}

/// Returns the last recorded bring-up phase.
pub fn current_phase() -> BringupPhase {
    BringupPhase::from_u8(PHASE.load(Ordering::Relaxed)).unwrap_or(BringupPhase::Halted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rail_reads_back_after_recording() {
        record_rail(3_842);
        assert_eq!(rail_millivolts(), Some(3_842));
    }

    #[test]
    fn phase_mirror_round_trips() {
        record_phase(BringupPhase::InterruptsArmed);
        assert_eq!(current_phase(), BringupPhase::InterruptsArmed);
        record_phase(BringupPhase::Idle);
        assert_eq!(current_phase(), BringupPhase::Idle);
    }
}
