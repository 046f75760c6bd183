//! Storage-agnostic filter predicates
//!
//! One AST is evaluated in memory ([`Predicate::matches`]), compiled to SQL by
//! the SQLite store, and rendered as a Mongo-style document for logs.

use serde_json::{Map, Value, json};
use shared::models::{Entity, EntityId, Field, FieldValue};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: FieldValue,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    pub fn exclusive(value: impl Into<FieldValue>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record
    True,
    /// Matches nothing; storage is never consulted for it
    False,
    Eq(Field, FieldValue),
    /// Sorted, deduplicated, never empty (an empty list becomes `False`)
    In(Field, Vec<EntityId>),
    IsNull(Field),
    NotNull(Field),
    /// Case-insensitive substring match on any of `fields`
    Contains { fields: Vec<Field>, needle: String },
    Range {
        field: Field,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: Field, value: impl Into<FieldValue>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn in_ids(field: Field, ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut ids: Vec<EntityId> = ids.into_iter().collect();
        if ids.is_empty() {
            return Self::False;
        }
        ids.sort_unstable();
        ids.dedup();
        Self::In(field, ids)
    }

    pub fn contains(fields: &[Field], needle: impl Into<String>) -> Self {
        Self::Contains {
            fields: fields.to_vec(),
            needle: needle.into(),
        }
    }

    pub fn range(field: Field, lower: Option<Bound>, upper: Option<Bound>) -> Self {
        if lower.is_none() && upper.is_none() {
            return Self::True;
        }
        Self::Range {
            field,
            lower,
            upper,
        }
    }

    /// Conjunction with identity and absorption folded away
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, p) | (p, Self::True) => p,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), p) => {
                a.push(p);
                Self::And(a)
            }
            (p, Self::And(b)) => {
                let mut parts = Vec::with_capacity(b.len() + 1);
                parts.push(p);
                parts.extend(b);
                Self::And(parts)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
        parts.into_iter().fold(Self::True, Self::and)
    }

    /// True when no record can match; callers skip storage entirely
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Self::False => true,
            Self::In(_, ids) => ids.is_empty(),
            Self::And(parts) => parts.iter().any(Self::is_unsatisfiable),
            _ => false,
        }
    }

    /// Every column this predicate reads
    pub fn fields(&self) -> Vec<Field> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_fields(&self, out: &mut Vec<Field>) {
        match self {
            Self::True | Self::False => {}
            Self::Eq(f, _) | Self::In(f, _) | Self::IsNull(f) | Self::NotNull(f) => out.push(*f),
            Self::Range { field, .. } => out.push(*field),
            Self::Contains { fields, .. } => out.extend(fields.iter().copied()),
            Self::And(parts) => parts.iter().for_each(|p| p.collect_fields(out)),
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Eq(field, value) => entity.field(*field).matches(value),
            Self::In(field, ids) => entity
                .field(*field)
                .as_i64()
                .is_some_and(|v| ids.binary_search(&v).is_ok()),
            Self::IsNull(field) => entity.field(*field).is_null(),
            Self::NotNull(field) => !entity.field(*field).is_null(),
            Self::Contains { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|f| {
                    entity
                        .field(*f)
                        .as_text()
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
            Self::Range {
                field,
                lower,
                upper,
            } => {
                let value = entity.field(*field);
                let above = lower.as_ref().is_none_or(|b| match value.compare(&b.value) {
                    Some(Ordering::Greater) => true,
                    Some(Ordering::Equal) => b.inclusive,
                    _ => false,
                });
                let below = upper.as_ref().is_none_or(|b| match value.compare(&b.value) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => b.inclusive,
                    _ => false,
                });
                above && below
            }
            Self::And(parts) => parts.iter().all(|p| p.matches(entity)),
        }
    }

    /// Mongo-style document, e.g. `{"status":"shipped","id":{"$in":[1,2,3]}}`
    pub fn to_document(&self) -> Value {
        match self {
            Self::True => json!({}),
            Self::False => json!({ "$false": true }),
            Self::Eq(field, value) => single(*field, field_value_json(value)),
            Self::In(field, ids) => single(*field, json!({ "$in": ids })),
            Self::IsNull(field) => single(*field, json!({ "$null": true })),
            Self::NotNull(field) => single(*field, json!({ "$null": false })),
            Self::Contains { fields, needle } => {
                let mut docs: Vec<Value> = fields
                    .iter()
                    .map(|f| single(*f, json!({ "$containsi": needle })))
                    .collect();
                if docs.len() == 1 {
                    docs.remove(0)
                } else {
                    json!({ "$or": docs })
                }
            }
            Self::Range {
                field,
                lower,
                upper,
            } => {
                let mut ops = Map::new();
                if let Some(b) = lower {
                    let op = if b.inclusive { "$gte" } else { "$gt" };
                    ops.insert(op.to_string(), field_value_json(&b.value));
                }
                if let Some(b) = upper {
                    let op = if b.inclusive { "$lte" } else { "$lt" };
                    ops.insert(op.to_string(), field_value_json(&b.value));
                }
                single(*field, Value::Object(ops))
            }
            Self::And(parts) => {
                let docs: Vec<Value> = parts.iter().map(Self::to_document).collect();
                let mut merged = Map::new();
                for doc in &docs {
                    let Value::Object(entries) = doc else {
                        return json!({ "$and": docs });
                    };
                    for (key, value) in entries {
                        if merged.contains_key(key) {
                            return json!({ "$and": docs });
                        }
                        merged.insert(key.clone(), value.clone());
                    }
                }
                Value::Object(merged)
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

fn single(field: Field, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(field.column().to_string(), value);
    Value::Object(map)
}

fn field_value_json(value: &FieldValue) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
