//! Ordered, fail-fast bring-up sequencing.
//!
//! Bring-up walks a fixed, linear phase machine exactly once:
//!
//! `Idle → RailMeasured → RegulatorConfigured → StackInitialized →
//! InterruptsArmed → BusVisible → Enumerated`
//!
//! Every step is a precondition for every later step and none is safely
//! retryable, so any failure transitions to the terminal `Halted` phase.
//! The orchestrator is the single construction site for the mutable hardware
//! aggregate; collaborators are only reachable through it.

use core::fmt;

use heapless::Vec;

use crate::irq::{IrqTier, arm_usb_tiers};
use crate::power::{Millivolts, RailProbe, RegulatorCommand, RegulatorControl};
use crate::stack::{ConnectPolicy, DeviceStack};
use crate::status::StatusCode;

/// Phases of the bring-up state machine, in execution order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BringupPhase {
    Idle,
    RailMeasured,
    RegulatorConfigured,
    StackInitialized,
    InterruptsArmed,
    BusVisible,
    Enumerated,
    /// Terminal trap phase. No recovery short of a full device reset.
    Halted,
}

impl BringupPhase {
    /// Stable numeric encoding, used by diagnostics mirrors.
    pub const fn as_u8(self) -> u8 {
        match self {
            BringupPhase::Idle => 0,
            BringupPhase::RailMeasured => 1,
            BringupPhase::RegulatorConfigured => 2,
            BringupPhase::StackInitialized => 3,
            BringupPhase::InterruptsArmed => 4,
            BringupPhase::BusVisible => 5,
            BringupPhase::Enumerated => 6,
            BringupPhase::Halted => 7,
        }
    }

    /// Decodes the numeric encoding produced by [`BringupPhase::as_u8`].
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(BringupPhase::Idle),
            1 => Some(BringupPhase::RailMeasured),
            2 => Some(BringupPhase::RegulatorConfigured),
            3 => Some(BringupPhase::StackInitialized),
            4 => Some(BringupPhase::InterruptsArmed),
            5 => Some(BringupPhase::BusVisible),
            6 => Some(BringupPhase::Enumerated),
            7 => Some(BringupPhase::Halted),
            _ => None,
        }
    }

    /// Returns `true` for the terminal trap phase.
    pub const fn is_halted(self) -> bool {
        matches!(self, BringupPhase::Halted)
    }
}

/// Fatal bring-up failure. There is no warning or partial-failure class.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BringupError {
    /// The rail probe's analog front end failed to initialize.
    PowerProbe(StatusCode),
    /// The device stack rejected its fixed configuration.
    StackInit(StatusCode),
    /// An interrupt tier could not be bound; no tier was unmasked.
    InterruptBind { tier: IrqTier, code: StatusCode },
    /// Bus presence or the enumeration wait failed.
    Connect(StatusCode),
    /// A step was attempted outside the fixed order. Programming error,
    /// still fatal.
    OutOfPhase {
        expected: BringupPhase,
        found: BringupPhase,
    },
}

impl BringupError {
    /// Collaborator status word attached to the failure, if any.
    pub const fn code(&self) -> Option<StatusCode> {
        match self {
            BringupError::PowerProbe(code)
            | BringupError::StackInit(code)
            | BringupError::Connect(code)
            | BringupError::InterruptBind { code, .. } => Some(*code),
            BringupError::OutOfPhase { .. } => None,
        }
    }
}

impl fmt::Display for BringupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BringupError::PowerProbe(code) => write!(f, "rail probe failed: {code}"),
            BringupError::StackInit(code) => write!(f, "device stack init failed: {code}"),
            BringupError::InterruptBind { tier, code } => {
                write!(f, "interrupt bind failed for {tier:?} tier: {code}")
            }
            BringupError::Connect(code) => write!(f, "bus connect failed: {code}"),
            BringupError::OutOfPhase { expected, found } => {
                write!(f, "step out of order: expected {expected:?}, found {found:?}")
            }
        }
    }
}

/// Pure observer of bring-up progress.
///
/// The debug build variant injects a text-emitting implementation; release
/// builds inject [`NoopBringupObserver`]. Observers feed nothing back into
/// control flow.
pub trait BringupObserver {
    /// Called after each successful phase transition.
    fn phase_changed(&mut self, _phase: BringupPhase) {}

    /// Called once, with the fatal error, before the system halts.
    fn fatal(&mut self, _error: &BringupError) {}
}

/// Observer that discards all notifications.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopBringupObserver;

impl BringupObserver for NoopBringupObserver {}

/// Number of phase transitions a trace can hold. One full bring-up emits
/// six; one extra slot records `Halted` on failure paths.
pub const PHASE_TRACE_DEPTH: usize = 8;

/// Bounded record of the phase transitions taken so far.
#[derive(Clone, Debug, Default)]
pub struct PhaseTrace<const CAPACITY: usize = PHASE_TRACE_DEPTH> {
    phases: Vec<BringupPhase, CAPACITY>,
}

impl<const CAPACITY: usize> PhaseTrace<CAPACITY> {
    /// Creates an empty trace.
    pub const fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Records a transition. Returns `false` when capacity is exhausted.
    pub fn record(&mut self, phase: BringupPhase) -> bool {
        self.phases.push(phase).is_ok()
    }

    /// Transitions recorded so far, oldest first.
    pub fn phases(&self) -> &[BringupPhase] {
        &self.phases
    }

    /// Most recent transition, if any.
    pub fn last(&self) -> Option<BringupPhase> {
        self.phases.last().copied()
    }
}

/// Drives the one-shot bring-up sequence over the hardware collaborators.
///
/// Owns the probe, regulator control, device stack, and interrupt controller
/// for the lifetime of bring-up. Step methods validate the current phase,
/// advance it on success, and trap to `Halted` on any failure.
pub struct BringupOrchestrator<P, R, S, C, O = NoopBringupObserver> {
    probe: P,
    regulator: R,
    stack: S,
    irq: C,
    observer: O,
    phase: BringupPhase,
    rail_mv: Option<Millivolts>,
    trace: PhaseTrace,
}

impl<P, R, S, C> BringupOrchestrator<P, R, S, C, NoopBringupObserver>
where
    P: RailProbe,
    R: RegulatorControl,
    S: DeviceStack,
    C: crate::irq::InterruptController,
{
    /// Builds an orchestrator with no diagnostic observer.
    pub fn with_components(probe: P, regulator: R, stack: S, irq: C) -> Self {
        Self::with_observer(probe, regulator, stack, irq, NoopBringupObserver)
    }
}

impl<P, R, S, C, O> BringupOrchestrator<P, R, S, C, O>
where
    P: RailProbe,
    R: RegulatorControl,
    S: DeviceStack,
    C: crate::irq::InterruptController,
    O: BringupObserver,
{
    /// Builds an orchestrator with an injected diagnostic observer.
    pub fn with_observer(probe: P, regulator: R, stack: S, irq: C, observer: O) -> Self {
        Self {
            probe,
            regulator,
            stack,
            irq,
            observer,
            phase: BringupPhase::Idle,
            rail_mv: None,
            trace: PhaseTrace::new(),
        }
    }

    /// Current phase of the bring-up machine.
    pub const fn phase(&self) -> BringupPhase {
        self.phase
    }

    /// Phase transitions taken so far.
    pub fn trace(&self) -> &[BringupPhase] {
        self.trace.phases()
    }

    /// Rail measurement, valid only after [`Self::measure_rail`] succeeded.
    pub const fn rail_millivolts(&self) -> Option<Millivolts> {
        self.rail_mv
    }

    /// Mutable access to the device stack, for interrupt dispatch.
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    fn advance(&mut self, next: BringupPhase) {
        self.phase = next;
        self.trace.record(next);
        self.observer.phase_changed(next);
    }

    fn fail(&mut self, error: BringupError) -> BringupError {
        self.phase = BringupPhase::Halted;
        self.trace.record(BringupPhase::Halted);
        self.observer.fatal(&error);
        error
    }

    fn expect_phase(&mut self, expected: BringupPhase) -> Result<(), BringupError> {
        if self.phase == expected {
            Ok(())
        } else {
            let found = self.phase;
            Err(self.fail(BringupError::OutOfPhase { expected, found }))
        }
    }

    /// Step 1: one-shot rail measurement through the analog front end.
    pub fn measure_rail(&mut self) -> Result<Millivolts, BringupError> {
        self.expect_phase(BringupPhase::Idle)?;
        match self.probe.measure() {
            Ok(rail_mv) => {
                self.rail_mv = Some(rail_mv);
                self.advance(BringupPhase::RailMeasured);
                Ok(rail_mv)
            }
            Err(code) => Err(self.fail(BringupError::PowerProbe(code))),
        }
    }

    /// Step 2: derive the regulator command from the measurement and apply it.
    pub fn configure_regulator(&mut self) -> Result<RegulatorCommand, BringupError> {
        self.expect_phase(BringupPhase::RailMeasured)?;
        let Some(rail_mv) = self.rail_mv else {
            let found = self.phase;
            return Err(self.fail(BringupError::OutOfPhase {
                expected: BringupPhase::RailMeasured,
                found,
            }));
        };

        let command = RegulatorCommand::for_rail(rail_mv);
        self.regulator.apply(command);
        self.advance(BringupPhase::RegulatorConfigured);
        Ok(command)
    }

    /// Step 3: initialize the device stack with its fixed configuration.
    ///
    /// Runs only after the regulator command so the transceiver's analog
    /// path is in its final state before enumeration logic activates.
    pub fn initialize_stack(&mut self) -> Result<(), BringupError> {
        self.expect_phase(BringupPhase::RegulatorConfigured)?;
        match self.stack.initialize() {
            Ok(()) => {
                self.advance(BringupPhase::StackInitialized);
                Ok(())
            }
            Err(code) => Err(self.fail(BringupError::StackInit(code))),
        }
    }

    /// Step 4: bind and unmask the three interrupt tiers.
    pub fn arm_interrupt_tiers(&mut self) -> Result<(), BringupError> {
        self.expect_phase(BringupPhase::StackInitialized)?;
        match arm_usb_tiers(&mut self.irq) {
            Ok(()) => {
                self.advance(BringupPhase::InterruptsArmed);
                Ok(())
            }
            Err(err) => Err(self.fail(BringupError::InterruptBind {
                tier: err.tier,
                code: err.code,
            })),
        }
    }

    /// Step 5: assert bus presence and block until enumeration completes.
    pub fn connect(&mut self) -> Result<(), BringupError> {
        self.expect_phase(BringupPhase::InterruptsArmed)?;
        self.advance(BringupPhase::BusVisible);
        match self.stack.connect(ConnectPolicy::WaitForever) {
            Ok(()) => {
                self.advance(BringupPhase::Enumerated);
                Ok(())
            }
            Err(code) => Err(self.fail(BringupError::Connect(code))),
        }
    }

    /// Runs the whole sequence in its fixed order, fail-fast.
    pub fn run_to_enumeration(&mut self) -> Result<(), BringupError> {
        self.measure_rail()?;
        self.configure_regulator()?;
        self.initialize_stack()?;
        self.arm_interrupt_tiers()?;
        self.connect()
    }

    /// Releases the device stack for steady-state interrupt dispatch.
    ///
    /// Only available once enumeration completed; otherwise the orchestrator
    /// is returned unchanged.
    pub fn into_steady_state(self) -> Result<S, Self> {
        if self.phase == BringupPhase::Enumerated {
            Ok(self.stack)
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irq::{InterruptCause, InterruptController, TierBinding};

    struct OkProbe(Millivolts);

    impl RailProbe for OkProbe {
        fn measure(&mut self) -> Result<Millivolts, StatusCode> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingRegulator(Option<RegulatorCommand>);

    impl RegulatorControl for RecordingRegulator {
        fn apply(&mut self, command: RegulatorCommand) {
            self.0 = Some(command);
        }
    }

    #[derive(Default)]
    struct OkStack {
        initialized: bool,
        connected: bool,
    }

    impl DeviceStack for OkStack {
        fn initialize(&mut self) -> Result<(), StatusCode> {
            self.initialized = true;
            Ok(())
        }

        fn connect(&mut self, _policy: ConnectPolicy) -> Result<(), StatusCode> {
            self.connected = true;
            Ok(())
        }

        fn interrupt_cause(&mut self, _tier: IrqTier) -> InterruptCause {
            InterruptCause::NONE
        }

        fn process_interrupt(&mut self, _cause: InterruptCause) {}

        fn is_enumerated(&self) -> bool {
            self.connected
        }
    }

    #[derive(Default)]
    struct OkController;

    impl InterruptController for OkController {
        fn bind(&mut self, _binding: TierBinding) -> Result<(), StatusCode> {
            Ok(())
        }

        fn unmask(&mut self, _tier: IrqTier) {}
    }

    fn orchestrator(
        rail_mv: Millivolts,
    ) -> BringupOrchestrator<OkProbe, RecordingRegulator, OkStack, OkController> {
        BringupOrchestrator::with_components(
            OkProbe(rail_mv),
            RecordingRegulator::default(),
            OkStack::default(),
            OkController,
        )
    }

    #[test]
    fn phases_advance_in_fixed_order() {
        let mut orch = orchestrator(4_000);
        orch.run_to_enumeration().expect("bring-up should succeed");

        assert_eq!(
            orch.trace(),
            &[
                BringupPhase::RailMeasured,
                BringupPhase::RegulatorConfigured,
                BringupPhase::StackInitialized,
                BringupPhase::InterruptsArmed,
                BringupPhase::BusVisible,
                BringupPhase::Enumerated,
            ]
        );
        assert_eq!(orch.phase(), BringupPhase::Enumerated);
    }

    #[test]
    fn steps_out_of_order_halt_the_machine() {
        let mut orch = orchestrator(4_000);
        let err = orch.connect().expect_err("connect before probe must fail");

        assert_eq!(
            err,
            BringupError::OutOfPhase {
                expected: BringupPhase::InterruptsArmed,
                found: BringupPhase::Idle,
            }
        );
        assert!(orch.phase().is_halted());
    }

    #[test]
    fn each_step_runs_at_most_once() {
        let mut orch = orchestrator(4_000);
        orch.measure_rail().expect("first measurement succeeds");
        let err = orch
            .measure_rail()
            .expect_err("second measurement must be rejected");

        assert!(matches!(err, BringupError::OutOfPhase { .. }));
        assert!(orch.phase().is_halted());
    }

    #[test]
    fn halted_machine_rejects_every_step() {
        let mut orch = orchestrator(4_000);
        let _ = orch.initialize_stack();
        assert!(orch.phase().is_halted());

        assert!(orch.measure_rail().is_err());
        assert!(orch.connect().is_err());
        assert!(orch.phase().is_halted());
    }

    #[test]
    fn steady_state_is_gated_on_enumeration() {
        let mut orch = orchestrator(4_000);
        orch.measure_rail().expect("measurement succeeds");

        let orch = match orch.into_steady_state() {
            Ok(_) => panic!("stack released before enumeration"),
            Err(orch) => orch,
        };
        assert_eq!(orch.phase(), BringupPhase::RailMeasured);
    }

    #[test]
    fn phase_encoding_round_trips() {
        for raw in 0..=7 {
            let phase = BringupPhase::from_u8(raw).expect("phase for raw value");
            assert_eq!(phase.as_u8(), raw);
        }
        assert_eq!(BringupPhase::from_u8(8), None);
    }
}
