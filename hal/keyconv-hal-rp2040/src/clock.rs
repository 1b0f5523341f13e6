//! Clock line sensing for pins owned by PIO
//!
//! Once a pin is handed to a PIO block its `Input` driver is gone, but the
//! pad input still feeds the SIO input register, which is read directly.

use embassy_rp::pac;
use keyconv_hal::InputPin;

/// Level of a GPIO read through SIO, regardless of its function select
#[derive(Debug, Clone, Copy)]
pub struct PioClockLine {
    mask: u32,
}

impl PioClockLine {
    /// Sense GPIO `pin` (0-29)
    pub const fn new(pin: u8) -> Self {
        Self { mask: 1 << pin }
    }
}

impl InputPin for PioClockLine {
    fn is_high(&self) -> bool {
        pac::SIO.gpio_in(0).read() & self.mask != 0
    }
}
