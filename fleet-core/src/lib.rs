//! fleet-core: Shared infrastructure for the fleet admin services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod pagination;
pub mod validation;

pub use axum;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower;
pub use tower_http;
pub use tracing;
pub use validator;
