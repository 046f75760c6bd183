//! Catalog Models (merchant-owned records)

use super::EntityId;
use super::principal::PrincipalId;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    /// Merchant that created the product
    pub created_by: PrincipalId,
    pub category_id: Option<EntityId>,
    pub price: f64,
    pub stock: i64,
    /// Publication time; `None` means draft
    pub published_at: Option<i64>,
    pub created_at: i64,
}

impl Product {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Category entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub created_by: PrincipalId,
    pub created_at: i64,
}

/// Storefront banner entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: EntityId,
    pub title: String,
    pub created_by: PrincipalId,
    pub published_at: Option<i64>,
    pub created_at: i64,
}
