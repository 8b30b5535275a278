//! Billboard USB device construction.
//!
//! The device exposes no data interfaces: a billboard exists to carry its
//! descriptors and strings, so the builder produces a bare device whose only
//! traffic is control transfers. Enumeration progress is surfaced through a
//! bus handler that trips [`ConnectionState`] once the host selects the
//! configuration.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};

#[cfg(target_os = "none")]
pub const MAX_PACKET_SIZE: u16 = 64;

#[cfg(target_os = "none")]
const CONTROL_BUFFER_LEN: usize = 64;
#[cfg(target_os = "none")]
const CONFIG_DESCRIPTOR_LEN: usize = 64;
#[cfg(target_os = "none")]
const BOS_DESCRIPTOR_LEN: usize = 64;
#[cfg(target_os = "none")]
const MSOS_DESCRIPTOR_LEN: usize = 64;

/// Billboard device class triple from the USB class code tables.
#[cfg(target_os = "none")]
const BILLBOARD_CLASS: u8 = 0x11;

/// User-visible strings advertised in the USB descriptors.
#[derive(Clone, Copy, Debug)]
pub struct BillboardStrings {
    /// Manufacturer string descriptor.
    pub manufacturer: &'static str,
    /// Product string descriptor.
    pub product: &'static str,
    /// Unique serial number string descriptor (optional).
    pub serial_number: Option<&'static str>,
}

impl Default for BillboardStrings {
    fn default() -> Self {
        Self {
            manufacturer: "Billboard Controller",
            product: "USB-C Billboard Device",
            serial_number: None,
        }
    }
}

/// Enumeration progress shared between the bus handler and the main task.
///
/// The handler runs from the USB device task; the main task blocks on
/// [`ConnectionState::wait_enumerated`] with no timeout. The signal carries
/// the edge, the flag carries the level for later queries.
pub struct ConnectionState {
    configured: AtomicBool,
    enumerated: Signal<CriticalSectionRawMutex, ()>,
}

impl ConnectionState {
    pub const fn new() -> Self {
        Self {
            configured: AtomicBool::new(false),
            enumerated: Signal::new(),
        }
    }

    pub fn is_enumerated(&self) -> bool {
        self.configured.load(Ordering::Relaxed)
    }

    /// Waits until the host has configured the device. Never times out.
    pub async fn wait_enumerated(&self) {
        if self.is_enumerated() {
            return;
        }
        self.enumerated.wait().await;
    }

    fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::Relaxed);
        if configured {
            self.enumerated.signal(());
        }
    }
}

/// Bus event handler that reports enumeration to [`ConnectionState`].
#[cfg(target_os = "none")]
pub struct BusHandler {
    connection: &'static ConnectionState,
}

#[cfg(target_os = "none")]
impl BusHandler {
    pub const fn new(connection: &'static ConnectionState) -> Self {
        Self { connection }
    }
}

#[cfg(target_os = "none")]
impl embassy_usb::Handler for BusHandler {
    fn reset(&mut self) {
        defmt::trace!("usb: bus reset");
        self.connection.set_configured(false);
    }

    fn addressed(&mut self, addr: u8) {
        defmt::trace!("usb: addressed {}", addr);
    }

    fn configured(&mut self, configured: bool) {
        defmt::info!("usb: configured={}", configured);
        self.connection.set_configured(configured);
    }
}

/// Backing storage for the Embassy USB builder.
#[cfg(target_os = "none")]
pub struct UsbDeviceStorage {
    control_buf: [u8; CONTROL_BUFFER_LEN],
    config_descriptor: [u8; CONFIG_DESCRIPTOR_LEN],
    bos_descriptor: [u8; BOS_DESCRIPTOR_LEN],
    msos_descriptor: [u8; MSOS_DESCRIPTOR_LEN],
}

#[cfg(target_os = "none")]
impl UsbDeviceStorage {
    pub const fn new() -> Self {
        Self {
            control_buf: [0; CONTROL_BUFFER_LEN],
            config_descriptor: [0; CONFIG_DESCRIPTOR_LEN],
            bos_descriptor: [0; BOS_DESCRIPTOR_LEN],
            msos_descriptor: [0; MSOS_DESCRIPTOR_LEN],
        }
    }
}

#[cfg(target_os = "none")]
pub type UsbDriver = embassy_stm32::usb::Driver<'static, embassy_stm32::peripherals::USB>;

#[cfg(target_os = "none")]
pub type BillboardDevice = embassy_usb::UsbDevice<'static, UsbDriver>;

/// Builds the billboard device on top of the hardware driver.
#[cfg(target_os = "none")]
pub fn build_device(
    driver: UsbDriver,
    storage: &'static mut UsbDeviceStorage,
    strings: BillboardStrings,
    handler: &'static mut BusHandler,
) -> BillboardDevice {
    let mut config = embassy_usb::Config::new(0x1209, 0x0010);
    config.manufacturer = Some(strings.manufacturer);
    config.product = Some(strings.product);
    config.serial_number = strings.serial_number;
    config.max_packet_size_0 = MAX_PACKET_SIZE as u8;
    config.max_power = 100;
    config.device_class = BILLBOARD_CLASS;
    config.device_sub_class = 0x00;
    config.device_protocol = 0x00;

    let mut builder = embassy_usb::Builder::new(
        driver,
        config,
        &mut storage.config_descriptor,
        &mut storage.bos_descriptor,
        &mut storage.msos_descriptor,
        &mut storage.control_buf,
    );
    builder.handler(handler);

    builder.build()
}
