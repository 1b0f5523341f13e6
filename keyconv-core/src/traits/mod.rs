//! Collaborator traits
//!
//! These traits define the interface between the protocol engine and the
//! layers above it (USB HID report assembly and status output) and the
//! coordinator's view of the device port.

pub mod hid;
pub mod port;
pub mod status;

pub use hid::HidSink;
pub use port::PortControl;
pub use status::StatusSink;
