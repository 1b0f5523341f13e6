//! Values produced for the USB HID side

/// A normalized key transition
///
/// `code` lives in the interface code space of the scan-code set that
/// produced it; the keymap layer interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// Interface key code
    pub code: u8,
    /// true for press, false for release
    pub make: bool,
}

impl KeyEvent {
    /// Key press
    pub const fn make(code: u8) -> Self {
        Self { code, make: true }
    }

    /// Key release
    pub const fn brk(code: u8) -> Self {
        Self { code, make: false }
    }
}

/// Relative mouse movement with button state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    /// Button bitmap: bit 0 left, bit 1 right, bit 2 middle
    pub buttons: u8,
    /// Horizontal movement, positive right
    pub dx: i16,
    /// Vertical movement, positive down (HID orientation)
    pub dy: i16,
    /// Wheel movement, positive away from the user
    pub wheel: i8,
}

/// Host lock-key LED state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockLeds {
    pub num: bool,
    pub caps: bool,
    pub scroll: bool,
}

impl LockLeds {
    /// From a USB HID keyboard output report (bit 0 Num, 1 Caps, 2 Scroll)
    pub const fn from_hid_report(report: u8) -> Self {
        Self {
            num: report & 0x01 != 0,
            caps: report & 0x02 != 0,
            scroll: report & 0x04 != 0,
        }
    }

    /// Bitmap for the PS/2 SET_LOCK_LEDS argument (bit 0 Scroll, 1 Num, 2 Caps)
    pub const fn to_ps2_bitmap(self) -> u8 {
        (self.scroll as u8) | ((self.num as u8) << 1) | ((self.caps as u8) << 2)
    }
}
