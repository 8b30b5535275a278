//! Interrupt tier registration and dispatch.
//!
//! The USB transceiver categorizes hardware events into three urgency tiers.
//! Each tier is bound to a fixed-priority interrupt source exactly once
//! during bring-up, and every tier forwards its pending-cause bitmap to the
//! device stack's single interrupt processor through a flat dispatch table.
//! The set of tiers is fixed at three and never grows, so the table is
//! enum-tagged rather than trait-object based.

use heapless::Vec;

use crate::stack::DeviceStack;
use crate::status::StatusCode;

/// Number of interrupt tiers exposed by the USB transceiver.
pub const TIER_COUNT: usize = 3;

/// Urgency class of a USB hardware event source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrqTier {
    /// Bus reset / SOF class events. Preempts everything else.
    High,
    /// Endpoint data events.
    Medium,
    /// Bulk status / housekeeping events.
    Low,
}

impl IrqTier {
    /// All tiers in bind order, most urgent first.
    pub const ALL: [IrqTier; TIER_COUNT] = [IrqTier::High, IrqTier::Medium, IrqTier::Low];

    /// Controller priority programmed for this tier (0 is most urgent).
    pub const fn priority(self) -> u8 {
        match self {
            IrqTier::High => 0,
            IrqTier::Medium => 1,
            IrqTier::Low => 2,
        }
    }

    /// Deterministic index for table lookups.
    pub const fn as_index(self) -> usize {
        self.priority() as usize
    }

    /// Attempts to construct an [`IrqTier`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(IrqTier::High),
            1 => Some(IrqTier::Medium),
            2 => Some(IrqTier::Low),
            _ => None,
        }
    }
}

/// Pending-cause bitmap read from the transceiver for one tier.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InterruptCause(u32);

impl InterruptCause {
    /// Wraps a raw cause bitmap.
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Bitmap with no causes pending.
    pub const NONE: InterruptCause = InterruptCause(0);

    /// Returns the raw bitmap.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` when no cause bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Forwarding shim invoked by the hardware controller when a tier fires.
///
/// Dispatchers hold no state beyond their tier tag, never block, and return
/// promptly so lower tiers and the foreground loop are not held off.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TierDispatcher {
    tier: IrqTier,
}

impl TierDispatcher {
    /// Creates the dispatcher for a tier.
    pub const fn new(tier: IrqTier) -> Self {
        Self { tier }
    }

    /// Returns the tier this dispatcher services.
    pub const fn tier(self) -> IrqTier {
        self.tier
    }

    /// Reads the tier's pending causes and hands them to the stack's
    /// interrupt processor.
    pub fn dispatch<S: DeviceStack>(self, stack: &mut S) {
        let cause = stack.interrupt_cause(self.tier);
        stack.process_interrupt(cause);
    }
}

/// Flat dispatch table mapping each tier to its forwarding shim.
#[derive(Copy, Clone, Debug)]
pub struct DispatchTable {
    dispatchers: [TierDispatcher; TIER_COUNT],
}

impl DispatchTable {
    /// Builds the table with one dispatcher per tier.
    pub const fn new() -> Self {
        Self {
            dispatchers: [
                TierDispatcher::new(IrqTier::High),
                TierDispatcher::new(IrqTier::Medium),
                TierDispatcher::new(IrqTier::Low),
            ],
        }
    }

    /// Looks up the dispatcher bound to `tier`.
    pub const fn dispatcher(&self, tier: IrqTier) -> TierDispatcher {
        self.dispatchers[tier.as_index()]
    }

    /// Dispatches a tier's pending causes into the device stack.
    pub fn dispatch<S: DeviceStack>(&self, tier: IrqTier, stack: &mut S) {
        self.dispatcher(tier).dispatch(stack);
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable registration record binding one tier to its dispatcher.
///
/// Records are constructed once, before the controller is armed, and never
/// mutated afterwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TierBinding {
    pub tier: IrqTier,
    pub priority: u8,
    pub dispatcher: TierDispatcher,
}

impl TierBinding {
    /// Builds the canonical binding for a tier.
    pub const fn for_tier(tier: IrqTier) -> Self {
        Self {
            tier,
            priority: tier.priority(),
            dispatcher: TierDispatcher::new(tier),
        }
    }
}

/// Abstraction over the hardware interrupt controller.
pub trait InterruptController {
    /// Binds a source to its dispatcher and programs its priority.
    fn bind(&mut self, binding: TierBinding) -> Result<(), StatusCode>;

    /// Unmasks an already-bound source at the controller.
    fn unmask(&mut self, tier: IrqTier);
}

/// Failure reported when a tier could not be bound.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TierBindError {
    pub tier: IrqTier,
    pub code: StatusCode,
}

/// Binds all three tiers in order high → medium → low, then unmasks them.
///
/// No tier is unmasked until every tier is bound; unmasking with an unbound
/// handler would dispatch into undefined behavior. Any single bind failure
/// aborts the remaining binds and leaves every tier masked.
pub fn arm_usb_tiers<C: InterruptController>(controller: &mut C) -> Result<(), TierBindError> {
    let mut bound: Vec<IrqTier, TIER_COUNT> = Vec::new();

    for tier in IrqTier::ALL {
        controller
            .bind(TierBinding::for_tier(tier))
            .map_err(|code| TierBindError { tier, code })?;
        // Capacity equals TIER_COUNT, so the push cannot fail.
        let _ = bound.push(tier);
    }

    for tier in bound {
        controller.unmask(tier);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{ConnectPolicy, DeviceStack};
    use heapless::Vec as HeaplessVec;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum ControllerOp {
        Bind(IrqTier, u8),
        Unmask(IrqTier),
    }

    struct MockController {
        ops: HeaplessVec<ControllerOp, 8>,
        fail_on: Option<IrqTier>,
    }

    impl MockController {
        fn new() -> Self {
            Self {
                ops: HeaplessVec::new(),
                fail_on: None,
            }
        }

        fn failing_on(tier: IrqTier) -> Self {
            Self {
                ops: HeaplessVec::new(),
                fail_on: Some(tier),
            }
        }
    }

    impl InterruptController for MockController {
        fn bind(&mut self, binding: TierBinding) -> Result<(), StatusCode> {
            if self.fail_on == Some(binding.tier) {
                return Err(StatusCode::new(0xBAD0));
            }
            self.ops
                .push(ControllerOp::Bind(binding.tier, binding.priority))
                .unwrap();
            Ok(())
        }

        fn unmask(&mut self, tier: IrqTier) {
            self.ops.push(ControllerOp::Unmask(tier)).unwrap();
        }
    }

    struct RecordingStack {
        causes: [InterruptCause; TIER_COUNT],
        processed: HeaplessVec<InterruptCause, 8>,
    }

    impl RecordingStack {
        fn new() -> Self {
            Self {
                causes: [
                    InterruptCause::new(0x01),
                    InterruptCause::new(0x02),
                    InterruptCause::new(0x04),
                ],
                processed: HeaplessVec::new(),
            }
        }
    }

    impl DeviceStack for RecordingStack {
        fn initialize(&mut self) -> Result<(), StatusCode> {
            Ok(())
        }

        fn connect(&mut self, _policy: ConnectPolicy) -> Result<(), StatusCode> {
            Ok(())
        }

        fn interrupt_cause(&mut self, tier: IrqTier) -> InterruptCause {
            self.causes[tier.as_index()]
        }

        fn process_interrupt(&mut self, cause: InterruptCause) {
            self.processed.push(cause).unwrap();
        }

        fn is_enumerated(&self) -> bool {
            false
        }
    }

    #[test]
    fn tiers_carry_fixed_priorities() {
        assert_eq!(IrqTier::High.priority(), 0);
        assert_eq!(IrqTier::Medium.priority(), 1);
        assert_eq!(IrqTier::Low.priority(), 2);
    }

    #[test]
    fn tier_index_round_trips() {
        for tier in IrqTier::ALL {
            assert_eq!(IrqTier::from_index(tier.as_index()), Some(tier));
        }
        assert_eq!(IrqTier::from_index(TIER_COUNT), None);
    }

    #[test]
    fn arm_binds_all_tiers_before_any_unmask() {
        let mut controller = MockController::new();
        arm_usb_tiers(&mut controller).expect("arming should succeed");

        assert_eq!(
            controller.ops.as_slice(),
            &[
                ControllerOp::Bind(IrqTier::High, 0),
                ControllerOp::Bind(IrqTier::Medium, 1),
                ControllerOp::Bind(IrqTier::Low, 2),
                ControllerOp::Unmask(IrqTier::High),
                ControllerOp::Unmask(IrqTier::Medium),
                ControllerOp::Unmask(IrqTier::Low),
            ]
        );
    }

    #[test]
    fn bind_failure_aborts_remaining_binds_and_unmasks_nothing() {
        let mut controller = MockController::failing_on(IrqTier::Medium);
        let err = arm_usb_tiers(&mut controller).expect_err("medium bind should fail");

        assert_eq!(err.tier, IrqTier::Medium);
        // High bound, low never attempted, nothing unmasked.
        assert_eq!(
            controller.ops.as_slice(),
            &[ControllerOp::Bind(IrqTier::High, 0)]
        );
    }

    #[test]
    fn dispatcher_forwards_its_tiers_cause() {
        let table = DispatchTable::new();
        let mut stack = RecordingStack::new();

        table.dispatch(IrqTier::Medium, &mut stack);
        table.dispatch(IrqTier::High, &mut stack);
        table.dispatch(IrqTier::Low, &mut stack);

        assert_eq!(
            stack.processed.as_slice(),
            &[
                InterruptCause::new(0x02),
                InterruptCause::new(0x01),
                InterruptCause::new(0x04),
            ]
        );
    }

    #[test]
    fn bindings_pair_each_tier_with_its_dispatcher() {
        for tier in IrqTier::ALL {
            let binding = TierBinding::for_tier(tier);
            assert_eq!(binding.priority, tier.priority());
            assert_eq!(binding.dispatcher.tier(), tier);
        }
    }
}
