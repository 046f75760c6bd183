//! Data models
//!
//! Shared between market-server and API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.

pub mod catalog;
pub mod customer;
pub mod entity;
pub mod field;
pub mod grant;
pub mod order;
pub mod principal;
pub mod resource;

// Re-exports
pub use catalog::*;
pub use customer::*;
pub use entity::*;
pub use field::*;
pub use grant::*;
pub use order::*;
pub use principal::*;
pub use resource::*;

use thiserror::Error;

/// Entity primary key
pub type EntityId = i64;

/// Failure to parse a textual model value (resource name, status, tag...)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseModelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseModelError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
