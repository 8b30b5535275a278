//! Transceiver regulator switch for the USB PHY.
//!
//! The enable line lives in a dedicated power-control word next to the USB
//! block. It is a plain level: writing the enable bit powers the transceiver
//! regulator, clearing it leaves the PHY on the raw rail.

#![cfg(target_os = "none")]

use core::ptr;

use bringup_core::power::{RegulatorCommand, RegulatorControl};

/// USB device block base address on this part.
const USB_BASE: u32 = 0x4000_5C00;

/// PHY power-control word holding the regulator enable line.
const PHY_POWER: *mut u32 = (USB_BASE + 0x54) as *mut u32;

const REGULATOR_ENABLE: u32 = 1 << 0;

/// Owner of the PHY power-control word.
pub struct TransceiverRegulator {
    _private: (),
}

impl TransceiverRegulator {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl RegulatorControl for TransceiverRegulator {
    fn apply(&mut self, command: RegulatorCommand) {
        unsafe {
            let word = ptr::read_volatile(PHY_POWER);
            let word = if command.is_enable() {
                word | REGULATOR_ENABLE
            } else {
                word & !REGULATOR_ENABLE
            };
            ptr::write_volatile(PHY_POWER, word);
        }
    }
}
