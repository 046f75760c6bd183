//! Generic entity wrapper and patches
//!
//! Storage and the visibility engine handle every resource through
//! [`Entity`], reading columns by [`Field`] and applying [`Patch`]es.

use super::catalog::{Banner, Category, Product};
use super::customer::Customer;
use super::field::{Field, FieldValue};
use super::order::{Order, OrderItem, OrderStatus};
use super::principal::PrincipalId;
use super::resource::ResourceType;
use super::EntityId;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Product(Product),
    Order(Order),
    OrderItem(OrderItem),
    Customer(Customer),
    Category(Category),
    Banner(Banner),
}

impl Entity {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Product(_) => ResourceType::Product,
            Self::Order(_) => ResourceType::Order,
            Self::OrderItem(_) => ResourceType::OrderItem,
            Self::Customer(_) => ResourceType::Customer,
            Self::Category(_) => ResourceType::Category,
            Self::Banner(_) => ResourceType::Banner,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::Product(p) => p.id,
            Self::Order(o) => o.id,
            Self::OrderItem(i) => i.id,
            Self::Customer(c) => c.id,
            Self::Category(c) => c.id,
            Self::Banner(b) => b.id,
        }
    }

    /// Owner of the record; `None` for shared entities
    pub fn created_by(&self) -> Option<PrincipalId> {
        match self {
            Self::Product(p) => Some(p.created_by),
            Self::Category(c) => Some(c.created_by),
            Self::Banner(b) => Some(b.created_by),
            Self::Order(_) | Self::OrderItem(_) | Self::Customer(_) => None,
        }
    }

    /// Read a column. Fields the resource does not store read as Null.
    pub fn field(&self, field: Field) -> FieldValue {
        match self {
            Self::Product(p) => match field {
                Field::Id => p.id.into(),
                Field::Name => p.name.as_str().into(),
                Field::CreatedBy => p.created_by.into(),
                Field::CategoryId => p.category_id.into(),
                Field::Price => p.price.into(),
                Field::Stock => p.stock.into(),
                Field::PublishedAt => p.published_at.into(),
                Field::CreatedAt => p.created_at.into(),
                _ => FieldValue::Null,
            },
            Self::Order(o) => match field {
                Field::Id => o.id.into(),
                Field::Reference => o.reference.as_str().into(),
                Field::CustomerId => o.customer_id.into(),
                Field::Status => o.status.into(),
                Field::TotalAmount => o.total_amount.into(),
                Field::CreatedAt => o.created_at.into(),
                _ => FieldValue::Null,
            },
            Self::OrderItem(i) => match field {
                Field::Id => i.id.into(),
                Field::OrderId => i.order_id.into(),
                Field::ProductId => i.product_id.into(),
                Field::Quantity => i.quantity.into(),
                Field::UnitPrice => i.unit_price.into(),
                _ => FieldValue::Null,
            },
            Self::Customer(c) => match field {
                Field::Id => c.id.into(),
                Field::Name => c.name.as_str().into(),
                Field::Email => c.email.as_str().into(),
                Field::CreatedAt => c.created_at.into(),
                _ => FieldValue::Null,
            },
            Self::Category(c) => match field {
                Field::Id => c.id.into(),
                Field::Name => c.name.as_str().into(),
                Field::CreatedBy => c.created_by.into(),
                Field::CreatedAt => c.created_at.into(),
                _ => FieldValue::Null,
            },
            Self::Banner(b) => match field {
                Field::Id => b.id.into(),
                Field::Title => b.title.as_str().into(),
                Field::CreatedBy => b.created_by.into(),
                Field::PublishedAt => b.published_at.into(),
                Field::CreatedAt => b.created_at.into(),
                _ => FieldValue::Null,
            },
        }
    }

    /// Apply every change of `patch` in order. The entity is left untouched
    /// when any change is rejected.
    pub fn apply(&mut self, patch: &Patch) -> Result<(), PatchError> {
        let mut next = self.clone();
        for (field, value) in patch.iter() {
            next.set(*field, value)?;
        }
        *self = next;
        Ok(())
    }

    fn set(&mut self, field: Field, value: &FieldValue) -> Result<(), PatchError> {
        let resource = self.resource_type();
        if field == Field::Id || !resource.has_field(field) {
            return Err(PatchError::NotWritable { field, resource });
        }
        match self {
            Self::Product(p) => match field {
                Field::Name => p.name = text(field, value)?,
                Field::CreatedBy => p.created_by = int(field, value)?,
                Field::CategoryId => p.category_id = opt_int(field, value)?,
                Field::Price => p.price = float(field, value)?,
                Field::Stock => p.stock = int(field, value)?,
                Field::PublishedAt => p.published_at = opt_int(field, value)?,
                _ => p.created_at = int(field, value)?,
            },
            Self::Order(o) => match field {
                Field::Reference => o.reference = text(field, value)?,
                Field::CustomerId => o.customer_id = int(field, value)?,
                Field::Status => o.status = status(value)?,
                Field::TotalAmount => o.total_amount = float(field, value)?,
                _ => o.created_at = int(field, value)?,
            },
            Self::OrderItem(i) => match field {
                Field::OrderId => i.order_id = int(field, value)?,
                Field::ProductId => i.product_id = int(field, value)?,
                Field::Quantity => i.quantity = int(field, value)?,
                _ => i.unit_price = float(field, value)?,
            },
            Self::Customer(c) => match field {
                Field::Name => c.name = text(field, value)?,
                Field::Email => c.email = text(field, value)?,
                _ => c.created_at = int(field, value)?,
            },
            Self::Category(c) => match field {
                Field::Name => c.name = text(field, value)?,
                Field::CreatedBy => c.created_by = int(field, value)?,
                _ => c.created_at = int(field, value)?,
            },
            Self::Banner(b) => match field {
                Field::Title => b.title = text(field, value)?,
                Field::CreatedBy => b.created_by = int(field, value)?,
                Field::PublishedAt => b.published_at = opt_int(field, value)?,
                _ => b.created_at = int(field, value)?,
            },
        }
        Ok(())
    }
}

fn int(field: Field, value: &FieldValue) -> Result<i64, PatchError> {
    value.as_i64().ok_or(PatchError::TypeMismatch { field })
}

fn opt_int(field: Field, value: &FieldValue) -> Result<Option<i64>, PatchError> {
    match value {
        FieldValue::Null => Ok(None),
        other => int(field, other).map(Some),
    }
}

fn float(field: Field, value: &FieldValue) -> Result<f64, PatchError> {
    value.as_f64().ok_or(PatchError::TypeMismatch { field })
}

fn text(field: Field, value: &FieldValue) -> Result<String, PatchError> {
    value
        .as_text()
        .map(str::to_string)
        .ok_or(PatchError::TypeMismatch { field })
}

fn status(value: &FieldValue) -> Result<OrderStatus, PatchError> {
    let raw = text(Field::Status, value)?;
    raw.parse()
        .map_err(|_| PatchError::TypeMismatch { field: Field::Status })
}

/// Ordered set of column changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    changes: Vec<(Field, FieldValue)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.changes.retain(|(f, _)| *f != field);
        self.changes.push((field, value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, FieldValue)> {
        self.changes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.changes
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    /// `{"column": value}` view for audit details
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .changes
            .iter()
            .map(|(f, v)| {
                let value = serde_json::to_value(v).unwrap_or(serde_json::Value::Null);
                (f.column().to_string(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("field '{field}' is not writable on {resource}")]
    NotWritable {
        field: Field,
        resource: ResourceType,
    },

    #[error("invalid value for field '{field}'")]
    TypeMismatch { field: Field },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: 5,
            name: "Desk lamp".into(),
            created_by: 42,
            category_id: None,
            price: 19.5,
            stock: 3,
            published_at: None,
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_field_access() {
        let entity = Entity::Product(product());
        assert_eq!(entity.resource_type(), ResourceType::Product);
        assert_eq!(entity.created_by(), Some(42));
        assert_eq!(entity.field(Field::Price), FieldValue::Float(19.5));
        assert_eq!(entity.field(Field::PublishedAt), FieldValue::Null);
        assert_eq!(entity.field(Field::Status), FieldValue::Null);
    }

    #[test]
    fn test_apply_patch() {
        let mut entity = Entity::Product(product());
        let patch = Patch::new()
            .set(Field::Stock, 10i64)
            .set(Field::PublishedAt, 1_700_000_100_000i64);
        entity.apply(&patch).unwrap();
        assert_eq!(entity.field(Field::Stock), FieldValue::Int(10));
        assert_eq!(
            entity.field(Field::PublishedAt),
            FieldValue::Int(1_700_000_100_000)
        );
    }

    #[test]
    fn test_rejected_patch_leaves_entity_untouched() {
        let mut entity = Entity::Product(product());
        let patch = Patch::new()
            .set(Field::Stock, 10i64)
            .set(Field::Status, "paid");
        let err = entity.apply(&patch).unwrap_err();
        assert!(matches!(err, PatchError::NotWritable { field: Field::Status, .. }));
        assert_eq!(entity.field(Field::Stock), FieldValue::Int(3));
    }

    #[test]
    fn test_order_status_patch_validates_value() {
        let mut entity = Entity::Order(Order {
            id: 100,
            reference: "ORD-100".into(),
            customer_id: 7,
            status: OrderStatus::Paid,
            total_amount: 40.0,
            created_at: 0,
        });
        assert!(entity
            .apply(&Patch::new().set(Field::Status, "teleported"))
            .is_err());
        entity
            .apply(&Patch::new().set(Field::Status, OrderStatus::Shipped))
            .unwrap();
        assert_eq!(entity.field(Field::Status), FieldValue::from("shipped"));
    }

    #[test]
    fn test_patch_json_and_last_write_wins() {
        let patch = Patch::new()
            .set(Field::Stock, 1i64)
            .set(Field::Stock, 2i64)
            .set(Field::PublishedAt, None::<i64>);
        assert_eq!(patch.get(Field::Stock), Some(&FieldValue::Int(2)));
        assert_eq!(
            patch.to_json(),
            serde_json::json!({"stock": 2, "published_at": null})
        );
    }
}
