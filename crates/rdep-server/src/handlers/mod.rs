//! Request handlers.

pub mod cache;
pub mod health;
