//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`submit`] — Download submission
//! - [`objects`] — DRS object descriptors and passport stubs
//! - [`downloads`] — Search, status and deletion
//! - [`files`] — File and bundle streaming
//! - [`system`] — Service info, health, OpenAPI

use serde::{Deserialize, Serialize};

mod downloads;
mod files;
mod objects;
mod submit;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use downloads::*;
pub use files::*;
pub use objects::*;
pub use submit::*;
pub use system::*;

/// Query parameters for GET /objects/:object_id
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
pub struct ObjectQuery {
    /// Expand bundle contents; accepted for compatibility, objects are single blobs
    #[serde(default)]
    pub expand: bool,
}
