//! Boundary contract for the vendor USB device stack.
//!
//! The stack owns the driver and device contexts (buffer, endpoint, and
//! descriptor bookkeeping) behind `&mut self`; bring-up and the interrupt
//! dispatchers are the only callers. The descriptor and enumeration protocol
//! machinery itself is the stack's business and is not modeled here.

use crate::irq::{InterruptCause, IrqTier};
use crate::status::StatusCode;

/// Wait policy handed to [`DeviceStack::connect`].
///
/// There is deliberately no timeout variant: this is a run-once, run-forever
/// design with no supported path to abort bring-up or re-arm the bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectPolicy {
    /// Block until the host completes enumeration, indefinitely.
    WaitForever,
}

/// Capability contract consumed from the USB device stack.
pub trait DeviceStack {
    /// Initializes the stack with its fixed device configuration, populating
    /// the driver and device contexts. Must run only after the regulator
    /// command has been applied; failure is fatal.
    fn initialize(&mut self) -> Result<(), StatusCode>;

    /// Commands the transceiver to present itself on the bus and blocks the
    /// calling context until enumeration completes.
    ///
    /// Implementations must keep interrupts serviceable while blocked;
    /// enumeration is driven by the same interrupts this call waits on.
    fn connect(&mut self, policy: ConnectPolicy) -> Result<(), StatusCode>;

    /// Reads and clears the pending-cause bitmap for one tier.
    fn interrupt_cause(&mut self, tier: IrqTier) -> InterruptCause;

    /// Single interrupt-processing entry point.
    ///
    /// Callable from any of the three tier contexts. Never re-entered
    /// concurrently with itself on the same core; the controller's priority
    /// preemption model enforces that naturally.
    fn process_interrupt(&mut self, cause: InterruptCause);

    /// Returns `true` once the host has addressed and configured the device.
    fn is_enumerated(&self) -> bool;
}
