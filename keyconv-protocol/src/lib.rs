//! Legacy keyboard wire protocols
//!
//! This crate owns the byte-level vocabulary of the four electrical
//! protocols the converter speaks and the frame codec that turns one
//! hardware-delivered word into a validated byte.
//!
//! # Frame Formats
//!
//! ```text
//! AT/PS2 (bidirectional, 11 bits, LSB first):
//! ┌───────┬────────────────┬────────┬──────┐
//! │ START │ D0 .. D7       │ PARITY │ STOP │
//! │ 0     │ 8 bits         │ odd    │ 1    │
//! └───────┴────────────────┴────────┴──────┘
//!
//! IBM XT (device to host only, 9 bits, LSB first):
//! ┌───────┬────────────────┐
//! │ START │ D0 .. D7       │
//! │ 1     │ 8 bits         │
//! └───────┴────────────────┘
//!
//! Amiga (8 bits, active low, sent as D6 D5 D4 D3 D2 D1 D0 D7)
//! Apple M0110 (8 bits, MSB first, keyboard-clocked both ways)
//! ```
//!
//! The hardware receiver already handles signal timing; everything here is a
//! pure function of the delivered word.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod commands;
pub mod events;
pub mod frame;
pub mod parity;

pub use events::{KeyEvent, LockLeds, MouseReport};
pub use frame::{decode_frame, encode_command, Frame, FrameError, WireFormat};
pub use parity::{odd_parity_bit, PARITY_TABLE};
