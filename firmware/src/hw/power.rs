//! One-shot VDD rail measurement through the internal voltage reference.
//!
//! The ADC samples VREFINT and scales the factory calibration constant to
//! recover the actual supply in millivolts. Bring-up only needs a single
//! trustworthy reading, so the probe discards the first conversion after
//! enabling the reference and averages nothing.

#![cfg(target_os = "none")]

use core::ptr;

use bringup_core::power::{Millivolts, RailProbe};
use bringup_core::status::StatusCode;
use embassy_stm32::adc::{Adc, SampleTime, VrefInt};
use embassy_stm32::peripherals::ADC1;

/// Factory-programmed VREFINT calibration constant, sampled at 3.3 V.
const VREFINT_CAL_ADDR: *const u16 = 0x1FFF_F7BA as *const u16;

/// Supply voltage present when the calibration constant was burned in.
const VREFINT_CAL_MV: u32 = 3_300;

/// Raised when the calibration word reads blank or erased.
const CALIBRATION_FAULT: StatusCode = StatusCode::new(0x0000_0011);

/// Raised when the conversion result is zero and the ratio is undefined.
const CONVERSION_FAULT: StatusCode = StatusCode::new(0x0000_0012);

/// Reads the factory-trimmed VREFINT calibration constant.
fn read_vrefint_calibration() -> u16 {
    unsafe { ptr::read_volatile(VREFINT_CAL_ADDR) }
}

/// Embassy ADC wrapper that measures the VDD rail once per request.
pub struct VddRailProbe<'d> {
    adc: Adc<'d, ADC1>,
    channel: VrefInt,
    discard_next: bool,
}

impl<'d> VddRailProbe<'d> {
    /// Constructs a new probe and enables the internal voltage reference.
    pub fn new(mut adc: Adc<'d, ADC1>) -> Self {
        adc.set_sample_time(SampleTime::CYCLES601_5);
        let channel = adc.enable_vrefint();
        Self {
            adc,
            channel,
            discard_next: true,
        }
    }

    fn read_once(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.channel)
    }
}

impl<'d> RailProbe for VddRailProbe<'d> {
    fn measure(&mut self) -> Result<Millivolts, StatusCode> {
        let calibration = read_vrefint_calibration();
        if calibration == 0 || calibration == u16::MAX {
            return Err(CALIBRATION_FAULT);
        }

        if self.discard_next {
            let _ = self.read_once();
            self.discard_next = false;
        }

        let reading = self.read_once();
        if reading == 0 {
            return Err(CONVERSION_FAULT);
        }

        // vdd = 3300 mV * CAL / reading, both counts taken at 12-bit scale.
        Ok(VREFINT_CAL_MV * u32::from(calibration) / u32::from(reading))
    }
}
