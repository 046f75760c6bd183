//! Resource types and operations known to the permission system

use super::ParseModelError;
use super::field::Field;
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of resource types subject to grants and scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Product,
    Order,
    OrderItem,
    Customer,
    Category,
    Banner,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        Self::Product,
        Self::Order,
        Self::OrderItem,
        Self::Customer,
        Self::Category,
        Self::Banner,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Order => "order",
            Self::OrderItem => "order_item",
            Self::Customer => "customer",
            Self::Category => "category",
            Self::Banner => "banner",
        }
    }

    /// Storage table name
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Order => "orders",
            Self::OrderItem => "order_items",
            Self::Customer => "customers",
            Self::Category => "categories",
            Self::Banner => "banners",
        }
    }

    /// URL path segment (`/api/resources/{segment}`)
    pub const fn path_segment(&self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Order => "orders",
            Self::OrderItem => "order-items",
            Self::Customer => "customers",
            Self::Category => "categories",
            Self::Banner => "banners",
        }
    }

    /// Human-readable label used in error messages
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Order => "Order",
            Self::OrderItem => "Order item",
            Self::Customer => "Customer",
            Self::Category => "Category",
            Self::Banner => "Banner",
        }
    }

    /// Resources carrying a `created_by` owner column
    pub const fn is_creator_owned(&self) -> bool {
        matches!(self, Self::Product | Self::Category | Self::Banner)
    }

    pub const fn not_found_code(&self) -> ErrorCode {
        match self {
            Self::Product => ErrorCode::ProductNotFound,
            Self::Order => ErrorCode::OrderNotFound,
            Self::OrderItem => ErrorCode::OrderItemNotFound,
            Self::Customer => ErrorCode::CustomerNotFound,
            Self::Category => ErrorCode::CategoryNotFound,
            Self::Banner => ErrorCode::BannerNotFound,
        }
    }

    /// Columns stored for this resource, id first
    pub const fn fields(&self) -> &'static [Field] {
        match self {
            Self::Product => &[
                Field::Id,
                Field::Name,
                Field::CreatedBy,
                Field::CategoryId,
                Field::Price,
                Field::Stock,
                Field::PublishedAt,
                Field::CreatedAt,
            ],
            Self::Order => &[
                Field::Id,
                Field::Reference,
                Field::CustomerId,
                Field::Status,
                Field::TotalAmount,
                Field::CreatedAt,
            ],
            Self::OrderItem => &[
                Field::Id,
                Field::OrderId,
                Field::ProductId,
                Field::Quantity,
                Field::UnitPrice,
            ],
            Self::Customer => &[Field::Id, Field::Name, Field::Email, Field::CreatedAt],
            Self::Category => &[Field::Id, Field::Name, Field::CreatedBy, Field::CreatedAt],
            Self::Banner => &[
                Field::Id,
                Field::Title,
                Field::CreatedBy,
                Field::PublishedAt,
                Field::CreatedAt,
            ],
        }
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ParseModelError;

    /// Accepts the snake_case name, the URL segment or the camelCase name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" | "products" => Ok(Self::Product),
            "order" | "orders" => Ok(Self::Order),
            "order_item" | "order-items" | "orderItem" | "order_items" => Ok(Self::OrderItem),
            "customer" | "customers" => Ok(Self::Customer),
            "category" | "categories" => Ok(Self::Category),
            "banner" | "banners" => Ok(Self::Banner),
            other => Err(ParseModelError::new("resource", other)),
        }
    }
}

/// Canonical operation checked against grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ParseModelError;

    /// `find` and `findOne` are read operations
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" | "find" | "findOne" | "find_one" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(ParseModelError::new("operation", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_operations_normalize_to_read() {
        assert_eq!("find".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("findOne".parse::<Operation>().unwrap(), Operation::Read);
        assert_eq!("delete".parse::<Operation>().unwrap(), Operation::Delete);
        assert!("publish".parse::<Operation>().is_err());
    }

    #[test]
    fn test_resource_parsing_accepts_path_segments() {
        assert_eq!(
            "order-items".parse::<ResourceType>().unwrap(),
            ResourceType::OrderItem
        );
        assert_eq!(
            "products".parse::<ResourceType>().unwrap(),
            ResourceType::Product
        );
        let err = "tables".parse::<ResourceType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown resource: 'tables'");
    }

    #[test]
    fn test_path_segment_roundtrip() {
        for resource in ResourceType::ALL {
            assert_eq!(
                resource.path_segment().parse::<ResourceType>().unwrap(),
                resource
            );
        }
    }

    #[test]
    fn test_creator_owned_resources() {
        assert!(ResourceType::Product.is_creator_owned());
        assert!(ResourceType::Banner.is_creator_owned());
        assert!(!ResourceType::Order.is_creator_owned());
        assert!(ResourceType::Product.has_field(Field::CreatedBy));
        assert!(!ResourceType::Customer.has_field(Field::CreatedBy));
    }
}
