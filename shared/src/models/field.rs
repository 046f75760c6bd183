//! Field names and values for generic entity access
//!
//! Filters and patches refer to columns through [`Field`] so that only known
//! column names ever reach a query string.

use super::ParseModelError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Title,
    Email,
    Reference,
    CreatedBy,
    CategoryId,
    Price,
    Stock,
    PublishedAt,
    CreatedAt,
    OrderId,
    ProductId,
    CustomerId,
    Quantity,
    UnitPrice,
    Status,
    TotalAmount,
}

impl Field {
    /// Column name in storage and in predicate documents
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Title => "title",
            Self::Email => "email",
            Self::Reference => "reference",
            Self::CreatedBy => "created_by",
            Self::CategoryId => "category_id",
            Self::Price => "price",
            Self::Stock => "stock",
            Self::PublishedAt => "published_at",
            Self::CreatedAt => "created_at",
            Self::OrderId => "order_id",
            Self::ProductId => "product_id",
            Self::CustomerId => "customer_id",
            Self::Quantity => "quantity",
            Self::UnitPrice => "unit_price",
            Self::Status => "status",
            Self::TotalAmount => "total_amount",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Field {
    type Err = ParseModelError;

    /// Accepts snake_case column names and their camelCase spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "id" => Self::Id,
            "name" => Self::Name,
            "title" => Self::Title,
            "email" => Self::Email,
            "reference" => Self::Reference,
            "created_by" | "createdBy" => Self::CreatedBy,
            "category_id" | "categoryId" => Self::CategoryId,
            "price" => Self::Price,
            "stock" => Self::Stock,
            "published_at" | "publishedAt" => Self::PublishedAt,
            "created_at" | "createdAt" => Self::CreatedAt,
            "order_id" | "orderId" => Self::OrderId,
            "product_id" | "productId" => Self::ProductId,
            "customer_id" | "customerId" => Self::CustomerId,
            "quantity" => Self::Quantity,
            "unit_price" | "unitPrice" => Self::UnitPrice,
            "status" => Self::Status,
            "total_amount" | "totalAmount" => Self::TotalAmount,
            other => return Err(ParseModelError::new("field", other)),
        };
        Ok(field)
    }
}

/// Dynamically typed column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering between comparable values. Int and Float compare numerically,
    /// Null and mismatched kinds are unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Equality used by predicate evaluation (numeric kinds compare by value)
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Key used for grouping and distinct counting
    pub fn group_key(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
