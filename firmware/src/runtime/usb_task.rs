use crate::usb::BillboardDevice;

/// Runs the billboard device state machine forever. All bus traffic arrives
/// through the armed USB interrupt tiers; this task drains their events and
/// answers the host's control transfers.
#[embassy_executor::task]
pub async fn run(mut device: BillboardDevice) -> ! {
    device.run().await
}
