use std::collections::VecDeque;
use std::time::Duration;

use bringup_core::bringup::{BringupError, BringupOrchestrator, BringupPhase};
use bringup_core::heartbeat::{HEARTBEAT_PERIOD, Heartbeat, Indicator};
use bringup_core::irq::{DispatchTable, InterruptCause, InterruptController, IrqTier, TierBinding};
use bringup_core::power::{Millivolts, RailProbe, RegulatorCommand, RegulatorControl};
use bringup_core::stack::{ConnectPolicy, DeviceStack};
use bringup_core::status::StatusCode;

// Simulated cause bits, one urgency class per tier plus a completion marker.
const CAUSE_BUS_RESET: u32 = 0x0001;
const CAUSE_EP_DATA: u32 = 0x0010;
const CAUSE_BULK_STATUS: u32 = 0x0100;
const CAUSE_ENUM_COMPLETE: u32 = 0x8000;

const NO_HOST: StatusCode = StatusCode::new(0x0000_0404);

/// Device stack whose enumeration is driven purely by scripted interrupt
/// arrivals: `connect` blocks (here, loops) until the interrupt processor has
/// consumed the event that completes enumeration.
struct SimulatedStack {
    pending_irqs: VecDeque<IrqTier>,
    processed: Vec<InterruptCause>,
    visible: bool,
    enumerated: bool,
}

impl SimulatedStack {
    fn with_script(script: &[IrqTier]) -> Self {
        Self {
            pending_irqs: script.iter().copied().collect(),
            processed: Vec::new(),
            visible: false,
            enumerated: false,
        }
    }

    const fn base_cause(tier: IrqTier) -> u32 {
        match tier {
            IrqTier::High => CAUSE_BUS_RESET,
            IrqTier::Medium => CAUSE_EP_DATA,
            IrqTier::Low => CAUSE_BULK_STATUS,
        }
    }
}

impl DeviceStack for SimulatedStack {
    fn initialize(&mut self) -> Result<(), StatusCode> {
        Ok(())
    }

    fn connect(&mut self, policy: ConnectPolicy) -> Result<(), StatusCode> {
        assert_eq!(policy, ConnectPolicy::WaitForever);
        self.visible = true;

        // The wait is serviced by the same interrupts it blocks on; each
        // scripted arrival plays one hardware interrupt.
        let table = DispatchTable::new();
        while !self.enumerated {
            let Some(tier) = self.pending_irqs.pop_front() else {
                return Err(NO_HOST);
            };
            table.dispatch(tier, self);
        }
        Ok(())
    }

    fn interrupt_cause(&mut self, tier: IrqTier) -> InterruptCause {
        let base = Self::base_cause(tier);
        // The last scripted event is the one that finishes enumeration.
        if self.pending_irqs.is_empty() {
            InterruptCause::new(base | CAUSE_ENUM_COMPLETE)
        } else {
            InterruptCause::new(base)
        }
    }

    fn process_interrupt(&mut self, cause: InterruptCause) {
        self.processed.push(cause);
        if cause.bits() & CAUSE_ENUM_COMPLETE != 0 {
            self.enumerated = true;
        }
    }

    fn is_enumerated(&self) -> bool {
        self.enumerated
    }
}

struct FixedProbe(Millivolts);

impl RailProbe for FixedProbe {
    fn measure(&mut self) -> Result<Millivolts, StatusCode> {
        Ok(self.0)
    }
}

struct SilentRegulator;

impl RegulatorControl for SilentRegulator {
    fn apply(&mut self, _command: RegulatorCommand) {}
}

struct SilentController;

impl InterruptController for SilentController {
    fn bind(&mut self, _binding: TierBinding) -> Result<(), StatusCode> {
        Ok(())
    }

    fn unmask(&mut self, _tier: IrqTier) {}
}

struct LevelIndicator {
    level: bool,
    toggles: u32,
}

impl Indicator for LevelIndicator {
    fn toggle(&mut self) {
        self.level = !self.level;
        self.toggles += 1;
    }
}

fn orchestrator_with_script(
    script: &[IrqTier],
) -> BringupOrchestrator<FixedProbe, SilentRegulator, SimulatedStack, SilentController> {
    BringupOrchestrator::with_components(
        FixedProbe(4_000),
        SilentRegulator,
        SimulatedStack::with_script(script),
        SilentController,
    )
}

#[test]
fn connect_completes_only_through_interrupt_processing() {
    let script = [IrqTier::High, IrqTier::Medium, IrqTier::Medium, IrqTier::Low];
    let mut orchestrator = orchestrator_with_script(&script);
    orchestrator
        .run_to_enumeration()
        .expect("bring-up should succeed");

    let stack = orchestrator
        .into_steady_state()
        .ok()
        .expect("stack released after enumeration");
    assert!(stack.is_enumerated());
    assert_eq!(stack.processed.len(), script.len());
    let last = stack.processed.last().expect("causes were processed");
    assert_ne!(last.bits() & CAUSE_ENUM_COMPLETE, 0);
}

#[test]
fn each_tier_forwards_its_own_cause_class() {
    let script = [IrqTier::High, IrqTier::Medium, IrqTier::Low];
    let mut orchestrator = orchestrator_with_script(&script);
    orchestrator
        .run_to_enumeration()
        .expect("bring-up should succeed");

    let stack = orchestrator
        .into_steady_state()
        .ok()
        .expect("stack released after enumeration");
    let bits: Vec<u32> = stack.processed.iter().map(|cause| cause.bits()).collect();
    assert_eq!(bits[0] & CAUSE_BUS_RESET, CAUSE_BUS_RESET);
    assert_eq!(bits[1] & CAUSE_EP_DATA, CAUSE_EP_DATA);
    assert_eq!(bits[2] & CAUSE_BULK_STATUS, CAUSE_BULK_STATUS);
}

#[test]
fn wait_that_never_sees_enumeration_reports_a_connect_fault() {
    let mut orchestrator = orchestrator_with_script(&[]);
    let err = orchestrator
        .run_to_enumeration()
        .expect_err("connect should fail with no host activity");

    assert_eq!(err, BringupError::Connect(NO_HOST));
    assert!(orchestrator.phase().is_halted());
    // The bus did go visible before the wait failed.
    assert!(
        orchestrator
            .trace()
            .contains(&BringupPhase::BusVisible)
    );
}

#[test]
fn heartbeat_toggles_every_half_second_after_enumeration() {
    let mut orchestrator =
        orchestrator_with_script(&[IrqTier::High, IrqTier::Medium, IrqTier::Low]);
    orchestrator
        .run_to_enumeration()
        .expect("bring-up should succeed");

    let mut heartbeat = Heartbeat::new();
    let mut indicator = LevelIndicator {
        level: false,
        toggles: 0,
    };

    let mut simulated_elapsed = Duration::ZERO;
    for iteration in 1..=5 {
        let pause = heartbeat.beat(&mut indicator);
        assert_eq!(pause, HEARTBEAT_PERIOD);
        simulated_elapsed += pause;
        assert_eq!(indicator.toggles, iteration);
        assert_eq!(indicator.level, iteration % 2 == 1);
    }

    assert_eq!(simulated_elapsed, Duration::from_millis(2_500));
    assert_eq!(heartbeat.beats(), 5);
}
