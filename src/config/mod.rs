//! Configuration parsing and types.
//!
//! - `types` - Root config structure (`Config`, `OrphanPolicy`)
//! - `duration` - Human-readable duration strings
//! - `parser` - Config file discovery and parsing
//! - `validation` - Config validation

mod duration;
mod parser;
mod types;
mod validation;

pub(crate) use duration::serde_duration;
pub use duration::parse_duration_string;
pub use parser::*;
pub use types::*;
