mod board;

use std::env;
use std::process;
use std::thread;

use bringup_core::bringup::BringupOrchestrator;
use bringup_core::heartbeat::Heartbeat;
use bringup_core::power::Millivolts;
use bringup_core::stack::DeviceStack;

use board::{
    ConsoleIndicator, FaultProfile, SimulatedIrqController, SimulatedRail, SimulatedRegulator,
    SimulatedUsbStack, TranscriptObserver,
};

/// Default simulated rail, a nominal 3.3 V supply.
const DEFAULT_RAIL_MV: Millivolts = 3_300;

/// Heartbeat iterations to show before the host process exits. The firmware
/// loop runs forever; a host transcript only needs to demonstrate cadence.
const HEARTBEAT_DEMO_BEATS: u32 = 4;

struct Options {
    rail_mv: Millivolts,
    profile: FaultProfile,
}

fn main() {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: billboard-emulator [--rail <millivolts>] \
             [--profile <nominal|probe-fault|stack-fault|bind-fault>]"
        );
        process::exit(2);
    });

    println!(
        "Billboard bring-up emulator: rail={} mV, profile={:?}",
        options.rail_mv, options.profile
    );

    let mut orchestrator = BringupOrchestrator::with_observer(
        SimulatedRail::new(options.rail_mv, options.profile),
        SimulatedRegulator::default(),
        SimulatedUsbStack::new(options.profile),
        SimulatedIrqController::new(options.profile),
        TranscriptObserver::default(),
    );

    if orchestrator.run_to_enumeration().is_err() {
        // The observer already printed the fatal line; mirror the firmware's
        // halt by exiting without ever touching the indicator.
        println!("halted: no heartbeat, no bus presence");
        process::exit(1);
    }

    let Ok(stack) = orchestrator.into_steady_state() else {
        unreachable!("enumeration succeeded");
    };
    println!(
        "steady state: enumerated={}, bus visible={}",
        stack.is_enumerated(),
        stack.is_visible()
    );

    let mut heartbeat = Heartbeat::new();
    let mut indicator = ConsoleIndicator::default();
    for _ in 0..HEARTBEAT_DEMO_BEATS {
        let pause = heartbeat.beat(&mut indicator);
        thread::sleep(pause);
    }
    println!("heartbeat: {} beats at 500 ms", heartbeat.beats());
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        rail_mv: DEFAULT_RAIL_MV,
        profile: FaultProfile::Nominal,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--rail=") {
            options.rail_mv = parse_rail(value)?;
        } else if arg == "--rail" {
            let value = args.next().ok_or("Expected value after --rail")?;
            options.rail_mv = parse_rail(&value)?;
        } else if let Some(value) = arg.strip_prefix("--profile=") {
            options.profile = FaultProfile::from_tag(value)?;
        } else if arg == "--profile" {
            let value = args.next().ok_or("Expected value after --profile")?;
            options.profile = FaultProfile::from_tag(&value)?;
        } else {
            return Err(format!("Unknown argument `{arg}`"));
        }
    }

    Ok(options)
}

fn parse_rail(value: &str) -> Result<Millivolts, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid rail millivolts `{value}`"))
}
