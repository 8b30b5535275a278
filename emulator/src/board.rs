//! Simulated board collaborators for the host-side bring-up run.
//!
//! Every trait seam from `bringup-core` gets a host implementation here. The
//! interesting one is the USB device stack: its `connect` call blocks on a
//! condition variable that only the simulated interrupt context signals, so
//! the emulator demonstrates the same wait-serviced-by-interrupts shape the
//! firmware has, rather than a spin loop.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bringup_core::bringup::{BringupError, BringupObserver, BringupPhase};
use bringup_core::irq::{
    DispatchTable, InterruptCause, InterruptController, IrqTier, TierBinding,
};
use bringup_core::power::{Millivolts, RailProbe, RegulatorCommand, RegulatorControl};
use bringup_core::stack::{ConnectPolicy, DeviceStack};
use bringup_core::status::StatusCode;

// Simulated pending-cause bits, one urgency class per tier.
pub const CAUSE_BUS_RESET: u32 = 0x0001;
pub const CAUSE_EP_SETUP: u32 = 0x0010;
pub const CAUSE_EP_DATA: u32 = 0x0020;
pub const CAUSE_BULK_STATUS: u32 = 0x0100;
pub const CAUSE_ENUM_COMPLETE: u32 = 0x8000;

const PROBE_INIT_FAULT: StatusCode = StatusCode::new(0x0000_0101);
const STACK_CONFIG_FAULT: StatusCode = StatusCode::new(0x0000_0202);
const BIND_FAULT: StatusCode = StatusCode::new(0x0000_0303);

/// Canned host-side enumeration traffic: (arrival delay, tier, cause bits).
const ENUMERATION_SCRIPT: &[(Duration, IrqTier, u32)] = &[
    (Duration::from_millis(20), IrqTier::High, CAUSE_BUS_RESET),
    (Duration::from_millis(10), IrqTier::Medium, CAUSE_EP_SETUP),
    (Duration::from_millis(10), IrqTier::Medium, CAUSE_EP_DATA),
    (Duration::from_millis(5), IrqTier::Low, CAUSE_BULK_STATUS),
    (
        Duration::from_millis(10),
        IrqTier::Medium,
        CAUSE_EP_SETUP | CAUSE_ENUM_COMPLETE,
    ),
];

/// Fault injected into one collaborator for a simulation run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultProfile {
    Nominal,
    ProbeFault,
    StackFault,
    BindFault,
}

impl FaultProfile {
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("nominal") {
            Ok(Self::Nominal)
        } else if tag.eq_ignore_ascii_case("probe-fault") {
            Ok(Self::ProbeFault)
        } else if tag.eq_ignore_ascii_case("stack-fault") {
            Ok(Self::StackFault)
        } else if tag.eq_ignore_ascii_case("bind-fault") {
            Ok(Self::BindFault)
        } else {
            Err(format!("Unknown fault profile `{tag}`"))
        }
    }
}

/// Rail probe returning a configured millivolt reading.
pub struct SimulatedRail {
    rail_mv: Millivolts,
    front_end_faulted: bool,
}

impl SimulatedRail {
    pub fn new(rail_mv: Millivolts, profile: FaultProfile) -> Self {
        Self {
            rail_mv,
            front_end_faulted: profile == FaultProfile::ProbeFault,
        }
    }
}

impl RailProbe for SimulatedRail {
    fn measure(&mut self) -> Result<Millivolts, StatusCode> {
        if self.front_end_faulted {
            return Err(PROBE_INIT_FAULT);
        }
        println!("rail: measured {} mV", self.rail_mv);
        Ok(self.rail_mv)
    }
}

/// Regulator block that just reports the command it was given.
#[derive(Default)]
pub struct SimulatedRegulator;

impl RegulatorControl for SimulatedRegulator {
    fn apply(&mut self, command: RegulatorCommand) {
        let label = match command {
            RegulatorCommand::Enable => "enable",
            RegulatorCommand::Disable => "disable",
        };
        println!("regulator: {label}");
    }
}

/// Interrupt controller that records registrations and enforces nothing.
pub struct SimulatedIrqController {
    profile: FaultProfile,
}

impl SimulatedIrqController {
    pub fn new(profile: FaultProfile) -> Self {
        Self { profile }
    }
}

impl InterruptController for SimulatedIrqController {
    fn bind(&mut self, binding: TierBinding) -> Result<(), StatusCode> {
        if self.profile == FaultProfile::BindFault && binding.tier == IrqTier::Medium {
            return Err(BIND_FAULT);
        }
        println!(
            "irq: bound {:?} tier at priority {}",
            binding.tier, binding.priority
        );
        Ok(())
    }

    fn unmask(&mut self, tier: IrqTier) {
        println!("irq: unmasked {tier:?} tier");
    }
}

#[derive(Default)]
struct StackInner {
    pending: [u32; 3],
    visible: bool,
    enumerated: bool,
    processed_causes: u32,
}

#[derive(Default)]
struct StackShared {
    inner: Mutex<StackInner>,
    enumeration_done: Condvar,
}

impl StackShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, StackInner> {
        self.inner.lock().expect("stack state lock poisoned")
    }

    fn take_cause(&self, tier: IrqTier) -> InterruptCause {
        let mut inner = self.lock();
        InterruptCause::new(core::mem::take(&mut inner.pending[tier.as_index()]))
    }

    fn process(&self, cause: InterruptCause) {
        let mut inner = self.lock();
        inner.processed_causes += 1;
        if cause.bits() & CAUSE_ENUM_COMPLETE != 0 {
            inner.enumerated = true;
            self.enumeration_done.notify_all();
        }
    }

    fn is_enumerated(&self) -> bool {
        self.lock().enumerated
    }
}

/// Host device stack. `connect` blocks until the simulated interrupt context
/// has pushed the completing cause through [`DeviceStack::process_interrupt`].
pub struct SimulatedUsbStack {
    shared: Arc<StackShared>,
    config_faulted: bool,
    irq_context: Option<JoinHandle<()>>,
}

impl SimulatedUsbStack {
    pub fn new(profile: FaultProfile) -> Self {
        Self {
            shared: Arc::new(StackShared::default()),
            config_faulted: profile == FaultProfile::StackFault,
            irq_context: None,
        }
    }

    /// Returns `true` once `connect` has asserted bus presence.
    pub fn is_visible(&self) -> bool {
        self.shared.lock().visible
    }

    /// Spawns the thread that plays the hardware interrupt contexts.
    ///
    /// Each scripted arrival raises a tier's cause bits and then runs the
    /// tier's dispatcher, exactly as the NVIC would invoke the shims.
    fn spawn_irq_context(&mut self) {
        let mut handle = IrqContextHandle {
            shared: Arc::clone(&self.shared),
        };
        self.irq_context = Some(thread::spawn(move || {
            let table = DispatchTable::new();
            for &(delay, tier, bits) in ENUMERATION_SCRIPT {
                thread::sleep(delay);
                handle.raise(tier, bits);
                table.dispatch(tier, &mut handle);
            }
        }));
    }
}

impl Drop for SimulatedUsbStack {
    fn drop(&mut self) {
        if let Some(irq_context) = self.irq_context.take() {
            let _ = irq_context.join();
        }
    }
}

impl DeviceStack for SimulatedUsbStack {
    fn initialize(&mut self) -> Result<(), StatusCode> {
        if self.config_faulted {
            return Err(STACK_CONFIG_FAULT);
        }
        println!("stack: initialized billboard configuration");
        Ok(())
    }

    fn connect(&mut self, policy: ConnectPolicy) -> Result<(), StatusCode> {
        debug_assert_eq!(policy, ConnectPolicy::WaitForever);
        self.shared.lock().visible = true;
        println!("stack: bus visible, waiting for enumeration");
        self.spawn_irq_context();

        let inner = self
            .shared
            .enumeration_done
            .wait_while(self.shared.lock(), |inner| !inner.enumerated)
            .expect("stack state lock poisoned");
        println!(
            "stack: enumeration complete after {} interrupts",
            inner.processed_causes
        );
        Ok(())
    }

    fn interrupt_cause(&mut self, tier: IrqTier) -> InterruptCause {
        self.shared.take_cause(tier)
    }

    fn process_interrupt(&mut self, cause: InterruptCause) {
        self.shared.process(cause);
    }

    fn is_enumerated(&self) -> bool {
        self.shared.is_enumerated()
    }
}

/// The interrupt context's view of the same shared stack state.
struct IrqContextHandle {
    shared: Arc<StackShared>,
}

impl IrqContextHandle {
    fn raise(&mut self, tier: IrqTier, bits: u32) {
        self.shared.lock().pending[tier.as_index()] |= bits;
        println!("irq: {tier:?} tier fired, cause=0x{bits:04X}");
    }
}

// The interrupt context reaches the stack through the same entry points the
// NVIC-invoked shims use; init/connect are foreground-only and never called
// from this handle.
impl DeviceStack for IrqContextHandle {
    fn initialize(&mut self) -> Result<(), StatusCode> {
        Ok(())
    }

    fn connect(&mut self, _policy: ConnectPolicy) -> Result<(), StatusCode> {
        Ok(())
    }

    fn interrupt_cause(&mut self, tier: IrqTier) -> InterruptCause {
        self.shared.take_cause(tier)
    }

    fn process_interrupt(&mut self, cause: InterruptCause) {
        self.shared.process(cause);
    }

    fn is_enumerated(&self) -> bool {
        self.shared.is_enumerated()
    }
}

/// LED stand-in that reports each toggle on stdout.
#[derive(Default)]
pub struct ConsoleIndicator {
    lit: bool,
}

impl bringup_core::heartbeat::Indicator for ConsoleIndicator {
    fn toggle(&mut self) {
        self.lit = !self.lit;
        let state = if self.lit { "on" } else { "off" };
        println!("led: {state}");
    }
}

/// Transcript observer standing in for the debug diagnostic branch.
#[derive(Default)]
pub struct TranscriptObserver;

impl BringupObserver for TranscriptObserver {
    fn phase_changed(&mut self, phase: BringupPhase) {
        println!("phase: {phase:?}");
    }

    fn fatal(&mut self, error: &BringupError) {
        match error.code() {
            Some(code) => println!("fatal: {error} (status {code})"),
            None => println!("fatal: {error}"),
        }
    }
}
