//! Scan-code decoders
//!
//! One decoder per scan code set turns the byte stream of an initialised
//! device into [`KeyEvent`]s, absorbing multi-byte prefix sequences. The
//! decoders are pure state machines: no I/O, and a function only of their
//! own state and the input byte.
//!
//! A byte that does not fit the current sequence resets the decoder to its
//! initial state and is reported as a [`SequenceError`]; it never affects
//! the device session.

pub mod amiga;
pub mod m0110;
pub mod mouse;
pub mod set1;
pub mod set2;
pub mod set3;

pub use amiga::AmigaDecoder;
pub use m0110::M0110Decoder;
pub use mouse::MouseDecoder;
pub use set1::Set1Decoder;
pub use set2::Set2Decoder;
pub use set3::Set3Decoder;

use keyconv_protocol::{KeyEvent, MouseReport};

use crate::config::{CodeSet, Protocol};
use crate::error::SequenceError;

/// Byte-at-a-time sequence decoder
pub trait SequenceDecoder {
    type Output;

    /// Consume one byte
    ///
    /// On error the decoder is back in its initial state.
    fn step(&mut self, byte: u8) -> Result<Option<Self::Output>, SequenceError>;

    /// Drop any partially consumed sequence
    fn reset(&mut self);

    /// Consume one byte, logging and absorbing sequence errors
    fn feed(&mut self, byte: u8) -> Option<Self::Output> {
        match self.step(byte) {
            Ok(out) => out,
            Err(SequenceError::UnexpectedByte(b)) => {
                warn!("decoder: unexpected byte {=u8:#x}, sequence dropped", b);
                self.reset();
                None
            }
        }
    }
}

/// Keyboard decoder for the configured scan code set
#[derive(Debug)]
pub enum ScancodeDecoder {
    Set1(Set1Decoder),
    Set2(Set2Decoder),
    Set3(Set3Decoder),
    Amiga(AmigaDecoder),
    M0110(M0110Decoder),
}

impl ScancodeDecoder {
    pub fn for_code_set(set: CodeSet) -> Self {
        match set {
            CodeSet::Set1 => ScancodeDecoder::Set1(Set1Decoder::new()),
            CodeSet::Set2 => ScancodeDecoder::Set2(Set2Decoder::new()),
            CodeSet::Set3 => ScancodeDecoder::Set3(Set3Decoder::new()),
        }
    }
}

impl SequenceDecoder for ScancodeDecoder {
    type Output = KeyEvent;

    fn step(&mut self, byte: u8) -> Result<Option<KeyEvent>, SequenceError> {
        match self {
            ScancodeDecoder::Set1(d) => d.step(byte),
            ScancodeDecoder::Set2(d) => d.step(byte),
            ScancodeDecoder::Set3(d) => d.step(byte),
            ScancodeDecoder::Amiga(d) => d.step(byte),
            ScancodeDecoder::M0110(d) => d.step(byte),
        }
    }

    fn reset(&mut self) {
        match self {
            ScancodeDecoder::Set1(d) => d.reset(),
            ScancodeDecoder::Set2(d) => d.reset(),
            ScancodeDecoder::Set3(d) => d.reset(),
            ScancodeDecoder::Amiga(d) => d.reset(),
            ScancodeDecoder::M0110(d) => d.reset(),
        }
    }
}

/// Decoded output of either device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decoded {
    Key(KeyEvent),
    Mouse(MouseReport),
}

/// Decoder matching the attached device
#[derive(Debug)]
pub enum InputDecoder {
    Keyboard(ScancodeDecoder),
    Mouse(MouseDecoder),
}

impl InputDecoder {
    /// Pick the decoder for a device
    ///
    /// `code_set` only matters for IBM keyboards, `wheel` only for mice.
    pub fn select(protocol: Protocol, code_set: CodeSet, wheel: bool) -> Self {
        match protocol {
            Protocol::AtPs2Keyboard | Protocol::Xt => {
                InputDecoder::Keyboard(ScancodeDecoder::for_code_set(code_set))
            }
            Protocol::AtPs2Mouse => InputDecoder::Mouse(MouseDecoder::new(wheel)),
            Protocol::Amiga => InputDecoder::Keyboard(ScancodeDecoder::Amiga(AmigaDecoder::new())),
            Protocol::M0110 => InputDecoder::Keyboard(ScancodeDecoder::M0110(M0110Decoder::new())),
        }
    }
}

impl SequenceDecoder for InputDecoder {
    type Output = Decoded;

    fn step(&mut self, byte: u8) -> Result<Option<Decoded>, SequenceError> {
        match self {
            InputDecoder::Keyboard(d) => Ok(d.step(byte)?.map(Decoded::Key)),
            InputDecoder::Mouse(d) => Ok(d.step(byte)?.map(Decoded::Mouse)),
        }
    }

    fn reset(&mut self) {
        match self {
            InputDecoder::Keyboard(d) => d.reset(),
            InputDecoder::Mouse(d) => d.reset(),
        }
    }
}

/// Feed a byte slice, collecting every output
#[cfg(test)]
pub(crate) fn feed_all<D: SequenceDecoder>(decoder: &mut D, bytes: &[u8]) -> Vec<D::Output> {
    bytes.iter().filter_map(|&b| decoder.feed(b)).collect()
}
