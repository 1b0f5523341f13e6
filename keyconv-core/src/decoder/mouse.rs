//! PS/2 mouse packet decoder
//!
//! ```text
//! byte 0: Yovf Xovf Ysign Xsign 1 Middle Right Left
//! byte 1: X movement (low 8 bits of a 9-bit two's complement value)
//! byte 2: Y movement, positive up
//! byte 3: Z movement, 4-bit two's complement (wheel mice only)
//! ```

use keyconv_protocol::MouseReport;

use super::SequenceDecoder;
use crate::error::SequenceError;

const BUTTONS: u8 = 0x07;
const ALWAYS_ONE: u8 = 0x08;
const X_SIGN: u8 = 0x10;
const Y_SIGN: u8 = 0x20;
const OVERFLOW: u8 = 0xC0;

#[derive(Debug, Default)]
pub struct MouseDecoder {
    packet: [u8; 4],
    len: usize,
    wheel: bool,
}

impl MouseDecoder {
    pub const fn new(wheel: bool) -> Self {
        Self {
            packet: [0; 4],
            len: 0,
            wheel,
        }
    }

    fn packet_len(&self) -> usize {
        if self.wheel {
            4
        } else {
            3
        }
    }

    fn report(&self) -> MouseReport {
        let [status, x, y, z] = self.packet;
        let dx = x as i16 - if status & X_SIGN != 0 { 256 } else { 0 };
        let dy = y as i16 - if status & Y_SIGN != 0 { 256 } else { 0 };
        // Sign-extend the low nibble
        let dz = ((z << 4) as i8) >> 4;
        MouseReport {
            buttons: status & BUTTONS,
            dx,
            dy: -dy,
            wheel: if self.wheel { -dz } else { 0 },
        }
    }
}

impl SequenceDecoder for MouseDecoder {
    type Output = MouseReport;

    fn step(&mut self, byte: u8) -> Result<Option<MouseReport>, SequenceError> {
        if self.len == 0 && byte & ALWAYS_ONE == 0 {
            return Err(SequenceError::UnexpectedByte(byte));
        }
        self.packet[self.len] = byte;
        self.len += 1;
        if self.len < self.packet_len() {
            return Ok(None);
        }
        self.len = 0;

        if self.packet[0] & OVERFLOW != 0 {
            debug!("mouse: overflow packet dropped");
            return Ok(None);
        }
        Ok(Some(self.report()))
    }

    fn reset(&mut self) {
        self.len = 0;
        self.packet = [0; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::feed_all;

    #[test]
    fn test_three_byte_packet() {
        let mut d = MouseDecoder::new(false);
        // Left button, dx = +5, dy = -3 (down)
        let reports = feed_all(&mut d, &[0x29, 0x05, 0xFD]);
        assert_eq!(
            reports,
            [MouseReport {
                buttons: 0x01,
                dx: 5,
                dy: 3,
                wheel: 0
            }]
        );
    }

    #[test]
    fn test_negative_x() {
        let mut d = MouseDecoder::new(false);
        let reports = feed_all(&mut d, &[0x18, 0xF6, 0x10]);
        assert_eq!(reports[0].dx, -10);
        assert_eq!(reports[0].dy, -16);
    }

    #[test]
    fn test_wheel_packet() {
        let mut d = MouseDecoder::new(true);
        // Wheel towards the user (z = +1) scrolls down
        let reports = feed_all(&mut d, &[0x08, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x0F]);
        assert_eq!(reports[0].wheel, -1);
        assert_eq!(reports[1].wheel, 1);
    }

    #[test]
    fn test_resync_on_bad_first_byte() {
        let mut d = MouseDecoder::new(false);
        assert_eq!(d.step(0x00), Err(SequenceError::UnexpectedByte(0x00)));
        assert_eq!(feed_all(&mut d, &[0x08, 0x01, 0x01]).len(), 1);
    }

    #[test]
    fn test_overflow_packet_dropped() {
        let mut d = MouseDecoder::new(false);
        assert!(feed_all(&mut d, &[0x48, 0xFF, 0x00]).is_empty());
        assert_eq!(feed_all(&mut d, &[0x08, 0x01, 0x00]).len(), 1);
    }
}
