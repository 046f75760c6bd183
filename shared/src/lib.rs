//! Shared types for the marketplace back office
//!
//! Domain models, the unified error system and response envelopes used by
//! the server crate and by API consumers.

pub mod error;
pub mod models;
pub mod pagination;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use pagination::PaginatedResponse;
