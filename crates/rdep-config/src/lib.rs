//! # rdep config
//!
//! Settings for the Redis connection and the demo server, loaded from an
//! optional TOML file and `REDIS_*` / `SERVER_*` environment variables.

mod loader;
mod parse;
mod settings;

pub use loader::*;
pub use settings::*;
