//! # rdep server
//!
//! Demo service showing the Redis dependency lifecycle: register at startup,
//! extract in handlers, terminate on shutdown.

pub mod handlers;
mod router;

pub use router::create_router;
