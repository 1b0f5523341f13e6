//! PIO programs for the keyboard wire protocols
//!
//! Every program runs at a 1 MHz PIO clock, so instruction delays read as
//! microseconds. The data pin is the IN/SET/OUT base and the clock pin sits
//! right above it (`pin 1` in `wait` instructions).
//!
//! # Programs
//!
//! | Protocol | Receive | Transmit | Extra |
//! |----------|---------|----------|-------|
//! | AT/PS2 | 11 bits on clock fall, LSB first | 10 bits after a 128 µs inhibit | |
//! | XT | start + 8 bits on clock fall | none | 20 ms clock-low soft reset on restart |
//! | Amiga | 8 bits on clock fall, MSB first | none | 85 µs data-low handshake |
//! | M0110 | 8 bits on clock rise, MSB first | 8 bits, host initiated | |

use keyconv_protocol::WireFormat;

/// PIO state machine clock
pub const PIO_TICK_HZ: u32 = 1_000_000;

/// Bits per received frame for each wire format
pub const fn frame_bits(format: WireFormat) -> u8 {
    match format {
        WireFormat::AtPs2 => 11,
        WireFormat::Xt => 9,
        WireFormat::Amiga | WireFormat::M0110 => 8,
    }
}

/// True if the receiver shifts LSB first (ISR shifts right)
pub const fn shifts_right(format: WireFormat) -> bool {
    matches!(format, WireFormat::AtPs2 | WireFormat::Xt)
}

/// Move a right-shifted ISR value down to bit 0
///
/// With right shifting the first bit received ends up `bits` positions below
/// bit 31; left-shifted words are already right-aligned.
pub fn right_align(raw: u32, format: WireFormat) -> u32 {
    if shifts_right(format) {
        raw >> (32 - frame_bits(format) as u32)
    } else {
        raw & 0xFF
    }
}

/// Place an encoded command where the transmit program shifts it out from
pub fn tx_word(word: u32, format: WireFormat) -> u32 {
    match format {
        // MSB first from bit 31
        WireFormat::M0110 => (word & 0xFF) << 24,
        _ => word,
    }
}

/// Calculate the 16.8 clock divider for a target PIO clock
///
/// Returns (integer_part, fractional_part).
pub fn calc_clock_divider(sys_hz: u32, tick_hz: u32) -> (u16, u8) {
    if tick_hz == 0 {
        return (0xFFFF, 0xFF);
    }
    let divider_x256 = (sys_hz as u64 * 256) / tick_hz as u64;
    let int_part = (divider_x256 / 256).clamp(1, 0xFFFF) as u16;
    let frac_part = (divider_x256 % 256) as u8;
    (int_part, frac_part)
}

/// Assembled program, at most one PIO block
pub type Program = ::pio::Program<32>;

/// AT/PS2: receive, plus host-to-device commands queued in the TX FIFO
///
/// An empty TX FIFO leaves X (zero) in the OSR. Command words always carry
/// a stop bit, so zero never names a real command.
pub fn at_ps2_program() -> Program {
    let prg = ::pio::pio_asm!(
        "    set pins, 0",
        ".wrap_target",
        "idle:",
        "    set x, 0",
        "    pull noblock",
        "    mov x, osr",
        "    jmp !x listen",
        // Inhibit: clock low for 128 us, then data low and release clock
        "    set y, 3",
        "    set pindirs, 2",
        "inhibit:",
        "    jmp y-- inhibit [31]",
        "    set pindirs, 3",
        "    set pindirs, 1 [7]",
        // Released line reads 1, driven line reads 0
        "    mov osr, ~x",
        "    set y, 9",
        "send_bit:",
        "    wait 0 pin 1",
        "    out pindirs, 1",
        "    wait 1 pin 1",
        "    jmp y-- send_bit",
        // Device ack
        "    wait 0 pin 1",
        "    wait 1 pin 1",
        "    jmp idle",
        "listen:",
        "    jmp pin idle",
        "    set y, 10",
        "recv_bit:",
        "    in pins, 1",
        "    wait 1 pin 1",
        "    jmp y-- recv_next",
        "    jmp idle",
        "recv_next:",
        "    wait 0 pin 1",
        "    jmp recv_bit",
        ".wrap",
    );
    prg.program
}

/// IBM XT: receive only
///
/// Starting at the origin holds the clock low for about 20 ms, which
/// resets the keyboard. Genuine IBM boards send a low start bit before the
/// high one; it is skipped.
pub fn xt_program() -> Program {
    let prg = ::pio::pio_asm!(
        "    set pins, 0",
        "    set pindirs, 2",
        "    set y, 19",
        "hold:",
        "    set x, 31",
        "hold_inner:",
        "    jmp x-- hold_inner [31]",
        "    jmp y-- hold",
        "    set pindirs, 0",
        ".wrap_target",
        "frame:",
        "    wait 0 pin 1",
        "    jmp pin start_bit",
        "    wait 1 pin 1",
        "    jmp frame",
        "start_bit:",
        "    in pins, 1",
        "    wait 1 pin 1",
        "    set y, 7",
        "data_bit:",
        "    wait 0 pin 1",
        "    in pins, 1",
        "    wait 1 pin 1",
        "    jmp y-- data_bit",
        ".wrap",
    );
    prg.program
}

/// Amiga: receive, acknowledging every byte with an 85 us data-low pulse
pub fn amiga_program() -> Program {
    let prg = ::pio::pio_asm!(
        "    set pins, 0",
        "    set pindirs, 0",
        ".wrap_target",
        "    set y, 7",
        "bit:",
        "    wait 0 pin 1",
        "    in pins, 1",
        "    wait 1 pin 1",
        "    jmp y-- bit",
        "    set pindirs, 1 [31]",
        "    nop [31]",
        "    nop [20]",
        "    set pindirs, 0",
        ".wrap",
    );
    prg.program
}

/// Apple M0110: every exchange is a host command followed by the reply
pub fn m0110_program() -> Program {
    let prg = ::pio::pio_asm!(
        "    set pins, 0",
        "    set pindirs, 0",
        ".wrap_target",
        "    pull block",
        "    mov osr, ~osr",
        "    set pindirs, 1 [31]",
        "    set y, 7",
        "send:",
        "    wait 0 pin 1",
        "    out pindirs, 1",
        "    wait 1 pin 1",
        "    jmp y-- send",
        "    set pindirs, 0",
        "    set y, 7",
        "recv:",
        "    wait 0 pin 1",
        "    wait 1 pin 1",
        "    in pins, 1",
        "    jmp y-- recv",
        ".wrap",
    );
    prg.program
}

/// Program for a wire format
pub fn program_for(format: WireFormat) -> Program {
    match format {
        WireFormat::AtPs2 => at_ps2_program(),
        WireFormat::Xt => xt_program(),
        WireFormat::Amiga => amiga_program(),
        WireFormat::M0110 => m0110_program(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_divider() {
        // 125 MHz system clock down to 1 MHz
        assert_eq!(calc_clock_divider(125_000_000, PIO_TICK_HZ), (125, 0));
        assert_eq!(calc_clock_divider(1_500_000, PIO_TICK_HZ), (1, 128));
    }

    #[test]
    fn test_right_align_at_frame() {
        // 11 bits shifted in from the top
        let word = 0x5A5 << 21;
        assert_eq!(right_align(word, WireFormat::AtPs2), 0x5A5);
        assert_eq!(right_align(0x1FF << 23, WireFormat::Xt), 0x1FF);
        assert_eq!(right_align(0x1BF, WireFormat::Amiga), 0xBF);
    }

    #[test]
    fn test_tx_word_placement() {
        assert_eq!(tx_word(0x10, WireFormat::M0110), 0x1000_0000);
        assert_eq!(tx_word(0x2F2, WireFormat::AtPs2), 0x2F2);
    }

    #[test]
    fn test_programs_fit_one_block() {
        for format in [
            WireFormat::AtPs2,
            WireFormat::Xt,
            WireFormat::Amiga,
            WireFormat::M0110,
        ] {
            assert!(program_for(format).code.len() <= 32);
        }
    }
}
