//! keyconv Hardware Abstraction Layer
//!
//! This crate defines the narrow hardware capability the protocol engine
//! consumes. Chip-specific HALs (RP2040 PIO today) implement these traits so
//! the session and decoder logic in `keyconv-core` never touches registers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  keyconv-firmware (tasks, executors)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  keyconv-core (sessions, decoders)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  keyconv-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  keyconv-hal-rp2040 (PIO, GPIO)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`interface::FrameReceiver`] - Hardware bit receiver (one raw word per frame)
//! - [`interface::CommandTransmitter`] - Host-to-device command path
//! - [`interface::ClockLine`] - Idle sensing of the device clock line

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod interface;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, OutputPin};
pub use interface::{
    ClockLine, CommandTransmitter, FrameReceiver, RawWord, ReceiveOnly, TransmitError,
};
