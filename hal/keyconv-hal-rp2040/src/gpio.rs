//! Status LED output

use embassy_rp::gpio::{Level, Output};
use embassy_rp::Peri;
use keyconv_hal::OutputPin;

/// LED driven through an embassy `Output`, honoring active-low wiring
pub struct StatusLed<'d> {
    pin: Output<'d>,
    inverted: bool,
}

impl<'d> StatusLed<'d> {
    /// Create the LED, initially off
    pub fn new(pin: Peri<'d, embassy_rp::gpio::AnyPin>, inverted: bool) -> Self {
        let off = if inverted { Level::High } else { Level::Low };
        Self {
            pin: Output::new(pin, off),
            inverted,
        }
    }

    pub fn set_on(&mut self, on: bool) {
        self.set_state(on != self.inverted);
    }
}

impl OutputPin for StatusLed<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }
}
