//! Customer Model

use super::EntityId;
use serde::{Deserialize, Serialize};

/// Customer entity (shared across merchants)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}
