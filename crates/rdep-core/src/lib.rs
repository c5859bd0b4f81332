//! # rdep core
//!
//! Error taxonomy and logging setup shared by every rdep crate.

pub mod error;
pub mod telemetry;

pub use error::*;
pub use telemetry::{init_logging, try_init_logging, LogFormat};
