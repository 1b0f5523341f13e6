//! Converter configuration
//!
//! Board-agnostic configuration structures and the TOML subset parser that
//! fills them from the firmware's embedded `converter.toml`.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
