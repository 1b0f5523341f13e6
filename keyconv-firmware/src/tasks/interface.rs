//! Receive path
//!
//! Waits on the PIO RX FIFO, hands every frame to the port and forwards
//! queued commands to the PIO TX FIFO. Runs at interrupt priority so frames
//! are consumed while thread-mode tasks are busy.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_rp::peripherals::PIO0;

use keyconv_core::FrameOutcome;
use keyconv_hal::{CommandTransmitter, FrameReceiver, RawWord};
use keyconv_hal_rp2040::PioInterface;

use crate::channels::{COMMANDS, DATA_READY, PORT, RESTART_RECEIVER, RING};

#[embassy_executor::task]
pub async fn interface_task(mut interface: PioInterface<'static, PIO0, 0>) {
    info!("Interface task started ({})", interface.format());

    loop {
        match select3(
            interface.wait_frame(),
            COMMANDS.receive(),
            RESTART_RECEIVER.wait(),
        )
        .await
        {
            Either3::First(word) => {
                // Take the rest of a burst straight from the FIFO
                let mut next = Some(word);
                while let Some(word) = next {
                    if handle_frame(word) == Some(FrameOutcome::RestartReceiver) {
                        warn!("Receiver lost bit alignment, restarting");
                        interface.restart();
                        break;
                    }
                    next = interface.read_frame();
                }
                if !RING.is_empty() {
                    DATA_READY.signal(());
                }
            }
            Either3::Second(word) => {
                if let Err(e) = interface.send_command(word) {
                    warn!("Command {=u32:#x} dropped: {}", word, e);
                }
            }
            Either3::Third(()) => {
                info!("Restarting receiver");
                interface.restart();
            }
        }
    }
}

fn handle_frame(word: RawWord) -> Option<FrameOutcome> {
    PORT.lock(|port| {
        port.borrow_mut()
            .as_mut()
            .map(|port| port.on_frame(word, &RING))
    })
}
