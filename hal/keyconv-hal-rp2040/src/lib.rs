//! RP2040 implementation of the keyconv protocol interface
//!
//! This crate provides RP2040-specific implementations of the shared
//! `keyconv-hal` traits:
//!
//! - PIO programs for the AT/PS2, XT, Amiga and M0110 wire protocols
//! - A frame receiver and command transmitter over one PIO state machine
//! - Clock line idle sensing for pins owned by PIO
//! - Status LED output
//! - Dynamic pin allocation for config-driven setup

#![no_std]

pub mod clock;
pub mod gpio;
pub mod interface;
pub mod pins;
pub mod pio;

pub use clock::PioClockLine;
pub use gpio::StatusLed;
pub use interface::PioInterface;
