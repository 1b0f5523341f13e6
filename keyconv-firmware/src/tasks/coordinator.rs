//! Coordinator task
//!
//! The thread-mode side of the engine. Every iteration runs the session
//! timeouts, then moves at most one byte from the ring buffer through the
//! decoder to the HID queue and reports the device lifecycle.

use defmt::*;
use embassy_futures::select::select;
use embassy_futures::yield_now;
use embassy_time::{Instant, Timer};

use keyconv_core::config::ConverterConfig;
use keyconv_core::error::DiagnosticLog;
use keyconv_core::TaskCoordinator;

use crate::channels::{
    ChannelSink, SharedPort, SignalStatus, DATA_READY, RESTART_RECEIVER, RING,
};

/// Longest sleep between iterations; bounds the timeout resolution
const IDLE_POLL_MS: u64 = 10;

#[embassy_executor::task]
pub async fn coordinator_task(config: ConverterConfig) {
    info!("Coordinator task started");

    let mut coordinator = TaskCoordinator::new(&config);
    let mut port = SharedPort;
    let mut diagnostics = DiagnosticLog::new();
    let mut sink = ChannelSink;
    let mut status = SignalStatus;
    let start = Instant::now();

    loop {
        let now_ms = start.elapsed().as_millis() as u32;
        let result = coordinator.poll(
            now_ms,
            &mut port,
            &mut diagnostics,
            &RING,
            &mut sink,
            &mut status,
        );

        if result.restart_receiver {
            RESTART_RECEIVER.signal(());
        }

        if result.consumed {
            // Let the other thread-mode tasks run between bytes
            yield_now().await;
        } else {
            select(DATA_READY.wait(), Timer::after_millis(IDLE_POLL_MS)).await;
        }
    }
}
