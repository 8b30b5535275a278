//! Heartbeat LED behind the shared indicator seam.

#![cfg(target_os = "none")]

use bringup_core::heartbeat::Indicator;
use embassy_stm32::gpio::Output;

pub struct UserLed<'d> {
    output: Output<'d>,
}

impl<'d> UserLed<'d> {
    pub fn new(output: Output<'d>) -> Self {
        Self { output }
    }
}

impl Indicator for UserLed<'_> {
    fn toggle(&mut self) {
        self.output.toggle();
    }
}
