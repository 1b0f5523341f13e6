//! Board-agnostic protocol interface engine for the keyboard converter
//!
//! This crate contains all logic that does not depend on a specific chip:
//!
//! - Interrupt-to-task byte queue ([`ringbuf`])
//! - Per-protocol device sessions: initialization, commands, timeouts ([`session`])
//! - Scan-code set decoders and the PS/2 mouse packet decoder ([`decoder`])
//! - Binding of hardware frames to a session ([`port`])
//! - The task-side drain loop ([`coordinator`])
//! - Configuration types and the converter TOML parser ([`config`])
//!
//! # Data Flow
//!
//! ```text
//! PIO receiver ─► Port::on_frame (interrupt) ─► RingBuffer
//!                        │                          │
//!                 DeviceSession               TaskCoordinator (thread)
//!                        │                          │
//!                CommandTransmitter          ScancodeDecoder ─► HidSink
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod error;
pub mod port;
pub mod ringbuf;
pub mod session;
pub mod traits;

pub use coordinator::TaskCoordinator;
pub use decoder::{InputDecoder, ScancodeDecoder, SequenceDecoder};
pub use error::{BufferOverflow, Diagnostic, SequenceError};
pub use port::{FrameOutcome, Port, PortStatus, PortTick};
pub use ringbuf::RingBuffer;
pub use session::{Action, DeviceSession, ProtocolSession};
pub use traits::{HidSink, PortControl, StatusSink};
