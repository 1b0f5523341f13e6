//! HID output trait

use keyconv_protocol::{KeyEvent, MouseReport};

/// Consumer of decoded input, usually the USB HID report builder
///
/// The coordinator only hands over an event after `ready()` returned true,
/// so implementations never need to queue more than one.
pub trait HidSink {
    /// True if the sink can accept one more event
    fn ready(&self) -> bool;

    /// Accept a key transition
    fn deliver(&mut self, event: KeyEvent);

    /// Accept a mouse movement report
    ///
    /// Keyboard-only sinks can ignore these.
    fn deliver_mouse(&mut self, _report: MouseReport) {}
}
