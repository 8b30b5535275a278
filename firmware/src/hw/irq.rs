//! NVIC registration for the three USB interrupt tiers.
//!
//! This part routes USB events over three distinct vectors: `USB_HP_CAN_TX`
//! carries the isochronous/double-buffered traffic, `USB_LP_CAN_RX0` carries
//! the bulk of endpoint events, and `USB_WKUP` carries resume signalling.
//! They map onto the high, medium, and low urgency tiers in that order, and
//! the tier priorities become NVIC preemption priorities directly so a
//! higher tier always preempts a lower one.

#![cfg(target_os = "none")]

use bringup_core::irq::{InterruptController, IrqTier, TierBinding};
use bringup_core::status::StatusCode;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};

/// NVIC-backed implementation of the tier registration seam.
pub struct NvicTierController {
    _private: (),
}

impl NvicTierController {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    const fn nvic_priority(tier: IrqTier) -> Priority {
        match tier {
            IrqTier::High => Priority::P0,
            IrqTier::Medium => Priority::P1,
            IrqTier::Low => Priority::P2,
        }
    }
}

impl InterruptController for NvicTierController {
    fn bind(&mut self, binding: TierBinding) -> Result<(), StatusCode> {
        let priority = Self::nvic_priority(binding.tier);
        match binding.tier {
            IrqTier::High => interrupt::USB_HP_CAN_TX.set_priority(priority),
            IrqTier::Medium => interrupt::USB_LP_CAN_RX0.set_priority(priority),
            IrqTier::Low => interrupt::USB_WKUP.set_priority(priority),
        }
        Ok(())
    }

    fn unmask(&mut self, tier: IrqTier) {
        unsafe {
            match tier {
                IrqTier::High => interrupt::USB_HP_CAN_TX.enable(),
                IrqTier::Medium => interrupt::USB_LP_CAN_RX0.enable(),
                IrqTier::Low => interrupt::USB_WKUP.enable(),
            }
        }
    }
}
