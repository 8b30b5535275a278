//! Embassy runtime wiring for the bring-up sequence.
//!
//! The main task walks the fixed bring-up order and never returns: either it
//! reaches enumeration and settles into the heartbeat loop, or one step
//! reports a fatal status and the firmware parks in [`halt`] with the LED
//! dark and the bus invisible.

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::rcc::{Hse, HseMode, Pll, PllMul, PllPreDiv, PllSource, Sysclk};
use embassy_stm32::time::Hertz;
use embassy_time::Timer;
use static_cell::StaticCell;

use bringup_core::bringup::{BringupError, BringupPhase};
use bringup_core::heartbeat::Heartbeat;
use bringup_core::irq::arm_usb_tiers;
use bringup_core::power::{RegulatorCommand, RegulatorControl};
use bringup_core::stack::ConnectPolicy;

use crate::hw::indicator::UserLed;
use crate::hw::irq::NvicTierController;
use crate::hw::power::VddRailProbe;
use crate::hw::regulator::TransceiverRegulator;
use crate::status;
use crate::usb::{self, BillboardStrings, BusHandler, ConnectionState, UsbDeviceStorage};

mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

hal::bind_interrupts!(struct UsbIrqs {
    USB_LP_CAN_RX0 => hal::usb::InterruptHandler<hal::peripherals::USB>;
});

static CONNECTION: ConnectionState = ConnectionState::new();
static USB_STORAGE: StaticCell<UsbDeviceStorage> = StaticCell::new();
static BUS_HANDLER: StaticCell<BusHandler> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    // 8 MHz crystal through the PLL: 72 MHz core, 48 MHz USB clock.
    let mut config = hal::Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(8_000_000),
        mode: HseMode::Oscillator,
    });
    config.rcc.pll = Some(Pll {
        src: PllSource::HSE,
        prediv: PllPreDiv::DIV1,
        mul: PllMul::MUL9,
    });
    config.rcc.sys = Sysclk::PLL1_P;

    let hal::Peripherals {
        ADC1,
        USB,
        PA11,
        PA12,
        PE9,
        ..
    } = hal::init(config);

    // Rail measurement happens exactly once, before anything touches USB.
    let mut probe = VddRailProbe::new(Adc::new(ADC1));
    let rail_mv = match probe.measure() {
        Ok(rail_mv) => rail_mv,
        Err(code) => halt(&BringupError::PowerProbe(code)),
    };
    status::record_rail(rail_mv);
    record_phase(BringupPhase::RailMeasured);
    defmt::info!("power: rail measured {} mV", rail_mv);

    let command = RegulatorCommand::for_rail(rail_mv);
    TransceiverRegulator::new().apply(command);
    record_phase(BringupPhase::RegulatorConfigured);
    defmt::info!("power: transceiver regulator enable={}", command.is_enable());

    // Device stack configuration. Descriptor sizing is fixed, so overflow
    // here is unreachable and the builder is free to assert internally.
    let storage = USB_STORAGE.init(UsbDeviceStorage::new());
    let handler = BUS_HANDLER.init(BusHandler::new(&CONNECTION));
    let driver = hal::usb::Driver::new(USB, UsbIrqs, PA12, PA11);
    let device = usb::build_device(driver, storage, BillboardStrings::default(), handler);
    record_phase(BringupPhase::StackInitialized);

    let mut nvic = NvicTierController::new();
    if let Err(bind_error) = arm_usb_tiers(&mut nvic) {
        halt(&BringupError::InterruptBind {
            tier: bind_error.tier,
            code: bind_error.code,
        });
    }
    record_phase(BringupPhase::InterruptsArmed);

    // Starting the device task asserts the pull-up; the bus is now visible
    // and enumeration is entirely in the hands of the armed interrupt tiers.
    spawner
        .spawn(usb_task::run(device))
        .expect("failed to spawn USB device task");
    record_phase(BringupPhase::BusVisible);
    defmt::info!("usb: bus visible, waiting for enumeration");

    wait_for_enumeration(ConnectPolicy::WaitForever).await;
    record_phase(BringupPhase::Enumerated);
    defmt::info!("usb: enumerated, entering heartbeat");

    let mut led = UserLed::new(Output::new(PE9, Level::Low, Speed::Low));
    let mut heartbeat = Heartbeat::new();
    loop {
        let pause = heartbeat.beat(&mut led);
        Timer::after(to_embassy_duration(pause)).await;
    }
}

/// Blocks the main task on the connection gate. The wait is serviced by the
/// USB interrupt tiers through the device task.
async fn wait_for_enumeration(policy: ConnectPolicy) {
    match policy {
        ConnectPolicy::WaitForever => CONNECTION.wait_enumerated().await,
    }
}

fn record_phase(phase: BringupPhase) {
    status::record_phase(phase);
}

fn to_embassy_duration(duration: core::time::Duration) -> embassy_time::Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    embassy_time::Duration::from_micros(micros)
}

/// Terminal fatal state: no heartbeat, no bus presence, no recovery.
fn halt(error: &BringupError) -> ! {
    status::record_phase(BringupPhase::Halted);
    match error.code() {
        Some(code) => defmt::error!("bringup halted, status {=u32:#010x}", code.get()),
        None => defmt::error!("bringup halted, sequencing violation"),
    }
    loop {
        cortex_m::asm::wfi();
    }
}
