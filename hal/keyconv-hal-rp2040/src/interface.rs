//! Protocol interface over one PIO state machine
//!
//! The state machine owns both lines. Received frames come out of the RX
//! FIFO; commands for bidirectional protocols go into the TX FIFO, where the
//! program picks them up between frames.

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::gpio::Pull;
use embassy_rp::pio::{Common, Config, Direction, Instance, PioPin, ShiftDirection, StateMachine};
use embassy_rp::Peri;
use fixed::types::U24F8;
use keyconv_hal::{CommandTransmitter, FrameReceiver, RawWord, TransmitError};
use keyconv_protocol::WireFormat;

use crate::pio::{
    calc_clock_divider, frame_bits, program_for, right_align, shifts_right, tx_word, PIO_TICK_HZ,
};

/// Frame receiver and command transmitter for one keyboard or mouse port
pub struct PioInterface<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    config: Config<'d, PIO>,
    format: WireFormat,
}

impl<'d, PIO: Instance, const SM: usize> PioInterface<'d, PIO, SM> {
    /// Load the program for `format` and start receiving
    ///
    /// `clock_pin` must be the GPIO directly above `data_pin`.
    pub fn new<D: PioPin, C: PioPin>(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        data_pin: Peri<'d, D>,
        clock_pin: Peri<'d, C>,
        format: WireFormat,
        pull_up: bool,
    ) -> Self {
        let program = program_for(format);
        let installed = common.load_program(&program);

        let mut data = common.make_pio_pin(data_pin);
        let mut clock = common.make_pio_pin(clock_pin);
        if pull_up {
            data.set_pull(Pull::Up);
            clock.set_pull(Pull::Up);
        }

        let mut cfg = Config::default();
        cfg.use_program(&installed, &[]);
        cfg.set_in_pins(&[&data, &clock]);
        // Lines are open drain: the programs only ever toggle pin directions
        cfg.set_set_pins(&[&data, &clock]);
        cfg.set_out_pins(&[&data]);
        match format {
            WireFormat::Xt => cfg.set_jmp_pin(&data),
            _ => cfg.set_jmp_pin(&clock),
        }

        let direction = if shifts_right(format) {
            ShiftDirection::Right
        } else {
            ShiftDirection::Left
        };
        cfg.shift_in.direction = direction;
        cfg.shift_in.threshold = frame_bits(format);
        cfg.shift_in.auto_fill = true;
        cfg.shift_out.direction = direction;
        cfg.shift_out.auto_fill = false;

        let (int_div, frac_div) = calc_clock_divider(clk_sys_freq(), PIO_TICK_HZ);
        cfg.clock_divider = U24F8::from_bits(((int_div as u32) << 8) | frac_div as u32);

        sm.set_config(&cfg);
        sm.set_pin_dirs(Direction::In, &[&data, &clock]);
        sm.set_enable(true);

        Self {
            sm,
            config: cfg,
            format,
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Wait for the next frame
    pub async fn wait_frame(&mut self) -> RawWord {
        let raw = self.sm.rx().wait_pull().await;
        right_align(raw, self.format)
    }
}

impl<PIO: Instance, const SM: usize> FrameReceiver for PioInterface<'_, PIO, SM> {
    fn read_frame(&mut self) -> Option<RawWord> {
        let format = self.format;
        self.sm.rx().try_pull().map(|raw| right_align(raw, format))
    }

    /// Drop partial bits and start over at the program origin
    ///
    /// For XT this also replays the soft-reset clock pulse.
    fn restart(&mut self) {
        self.sm.set_enable(false);
        self.sm.clear_fifos();
        self.sm.restart();
        self.sm.set_config(&self.config);
        self.sm.set_enable(true);
    }
}

impl<PIO: Instance, const SM: usize> CommandTransmitter for PioInterface<'_, PIO, SM> {
    fn send_command(&mut self, word: RawWord) -> Result<(), TransmitError> {
        if !self.format.is_bidirectional() {
            return Err(TransmitError::Unsupported);
        }
        if self.sm.tx().try_push(tx_word(word, self.format)) {
            Ok(())
        } else {
            Err(TransmitError::Busy)
        }
    }
}
