//! Command and response vocabulary
//!
//! Byte values exchanged with devices outside of the scan-code stream.

/// IBM AT/PS2 keyboards and mice
pub mod ps2 {
    // Host → device
    pub const RESET: u8 = 0xFF;
    pub const RESEND: u8 = 0xFE;
    pub const SET_ALL_MAKE_BREAK: u8 = 0xF8;
    pub const ENABLE_REPORTING: u8 = 0xF4;
    pub const SET_SAMPLE_RATE: u8 = 0xF3;
    pub const GET_ID: u8 = 0xF2;
    pub const SET_LOCK_LEDS: u8 = 0xED;

    // Device → host
    pub const ACK: u8 = 0xFA;
    pub const SELF_TEST_PASSED: u8 = 0xAA;
    pub const SELF_TEST_FAILED: u8 = 0xFC;
    pub const ECHO_RESPONSE: u8 = 0xEE;
    pub const RESEND_REQUEST: u8 = 0xFE;
    pub const KEY_ERROR: u8 = 0xFF;
    pub const BUFFER_OVERRUN: u8 = 0x00;

    /// Mouse id returned by GET_ID once the wheel is enabled
    pub const MOUSE_ID_WHEEL: u8 = 0x03;

    /// Sample rates of the IntelliMouse wheel "knock"
    pub const WHEEL_KNOCK: [u8; 3] = [200, 100, 80];
}

/// IBM PC/XT keyboards (no host → device path)
pub mod xt {
    pub const SELF_TEST_PASSED: u8 = 0xAA;
}

/// Commodore Amiga keyboards
///
/// Values are as decoded (inverted and de-rotated), not as on the wire.
pub mod amiga {
    pub const RESET_WARNING: u8 = 0x78;
    pub const LOST_SYNC: u8 = 0xF9;
    pub const BUFFER_OVERFLOW: u8 = 0xFA;
    pub const SELF_TEST_FAILED: u8 = 0xFC;
    pub const POWER_UP_STREAM_START: u8 = 0xFD;
    pub const POWER_UP_STREAM_END: u8 = 0xFE;

    /// Caps Lock key code; bit 7 carries the new LED state, not make/break
    pub const CAPS_LOCK: u8 = 0x62;

    /// Highest valid key code (modifiers end at 0x67)
    pub const MAX_KEY_CODE: u8 = 0x67;
}

/// Apple M0110 / M0110A keyboards
pub mod m0110 {
    // Host → device
    pub const INQUIRY: u8 = 0x10;
    pub const MODEL: u8 = 0x16;

    // Device → host
    pub const NULL: u8 = 0x7B;

    /// Prefix for keypad (and M0110A arrow) keys
    pub const KEYPAD_PREFIX: u8 = 0x79;
    /// Shift prefix preceding KEYPAD_PREFIX for the M0110A `= / * +` keys
    pub const SHIFT_PREFIX: u8 = 0x71;
}
