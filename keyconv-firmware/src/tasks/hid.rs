//! HID hand-off
//!
//! Consumer end of `HID_EVENTS`. Interface key codes still belong to the
//! scan code set that produced them; the USB keymap and report layer attach
//! here.

use defmt::*;

use keyconv_core::decoder::Decoded;

use crate::channels::HID_EVENTS;

#[embassy_executor::task]
pub async fn hid_task() {
    info!("HID task started");

    loop {
        match HID_EVENTS.receive().await {
            Decoded::Key(event) => {
                debug!(
                    "key {=u8:#x} {}",
                    event.code,
                    if event.make { "make" } else { "break" }
                );
            }
            Decoded::Mouse(report) => {
                debug!(
                    "mouse buttons={=u8:#x} dx={=i16} dy={=i16} wheel={=i8}",
                    report.buttons,
                    report.dx,
                    report.dy,
                    report.wheel
                );
            }
        }
    }
}
