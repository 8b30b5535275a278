//! Rail measurement and the regulator decision derived from it.
//!
//! The USB transceiver's internal regulator may only be enabled when the
//! supply rail is high enough, per vendor guidance encoded in
//! [`REGULATOR_THRESHOLD_MV`]. The rail is measured exactly once during
//! bring-up; the decision is a pure function of that single reading and is
//! never re-evaluated afterwards.

use crate::status::StatusCode;

/// Rail voltage in millivolts.
pub type Millivolts = u32;

/// Rail level above which the transceiver's internal regulator is enabled.
pub const REGULATOR_THRESHOLD_MV: Millivolts = 3_700;

/// Binary regulator-enable command issued to the USB hardware block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegulatorCommand {
    Enable,
    Disable,
}

impl RegulatorCommand {
    /// Derives the regulator command from a rail measurement.
    ///
    /// A reading of exactly [`REGULATOR_THRESHOLD_MV`] disables the
    /// regulator; only strictly higher readings enable it.
    pub const fn for_rail(rail_mv: Millivolts) -> Self {
        if rail_mv > REGULATOR_THRESHOLD_MV {
            RegulatorCommand::Enable
        } else {
            RegulatorCommand::Disable
        }
    }

    /// Returns `true` for [`RegulatorCommand::Enable`].
    pub const fn is_enable(self) -> bool {
        matches!(self, RegulatorCommand::Enable)
    }
}

/// One-shot probe of the rail feeding the USB transceiver.
///
/// Implementations measure through whatever analog front end the board
/// provides. Initialization failure of that front end is reported as an
/// error and treated as fatal: an unmeasured rail makes the regulator
/// decision unsafe, so bring-up never proceeds past a failed probe.
pub trait RailProbe {
    /// Performs a single synchronous measurement of the rail.
    fn measure(&mut self) -> Result<Millivolts, StatusCode>;
}

/// Control surface for the transceiver's internal voltage regulator.
///
/// The command is idempotent and unchecked at this boundary.
pub trait RegulatorControl {
    /// Applies the enable/disable command to the USB hardware block.
    fn apply(&mut self, command: RegulatorCommand);
}
