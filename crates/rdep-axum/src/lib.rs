//! # rdep axum
//!
//! Publishes a [`rdep_client::RedisDep`] on the application state at startup
//! and hands it to handlers through the [`RedisDependence`] extractor.

mod extractor;
mod registry;
mod response;
mod state;

pub use extractor::{depends_redis, RedisDependence};
pub use registry::RedisRegistry;
pub use response::{ApiResponse, AppError, ErrorResponse};
pub use state::{AppState, REDIS_STATE_KEY};
