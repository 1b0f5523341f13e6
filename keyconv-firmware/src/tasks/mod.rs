//! Embassy async tasks
//!
//! `interface_task` runs on the interrupt executor and preempts everything
//! else; the rest share the thread-mode executor and talk through the
//! statics in `channels`.

pub mod coordinator;
pub mod hid;
pub mod interface;
pub mod status_led;

pub use coordinator::coordinator_task;
pub use hid::hid_task;
pub use interface::interface_task;
pub use status_led::status_led_task;
