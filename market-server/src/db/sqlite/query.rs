//! Predicate → SQL
//!
//! Column names come from [`Field::column`], values are always bound.

use shared::models::{Field, FieldValue, ResourceType};
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{FindOptions, SortOrder};
use crate::filter::{Bound, Predicate};

/// Larger id sets are bound as one JSON array
const INLINE_IN_LIMIT: usize = 500;

pub(super) fn column_list(resource: ResourceType) -> String {
    resource
        .fields()
        .iter()
        .map(|f| f.column())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(super) fn select<'a>(resource: ResourceType, filter: &Predicate) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE ",
        column_list(resource),
        resource.table()
    ));
    push_predicate(&mut qb, filter);
    qb
}

pub(super) fn count<'a>(resource: ResourceType, filter: &Predicate) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE ", resource.table()));
    push_predicate(&mut qb, filter);
    qb
}

pub(super) fn push_options(qb: &mut QueryBuilder<'_, Sqlite>, resource: ResourceType, options: &FindOptions) {
    let sort = options
        .sort
        .unwrap_or_else(|| SortOrder::default_for(resource));
    let column = sort.field.column();
    let direction = if sort.descending { "DESC" } else { "ASC" };
    // NULL 永远排在最后
    qb.push(format!(
        " ORDER BY {column} IS NULL, {column} {direction}, id ASC"
    ));

    // SQLite 的 OFFSET 必须跟在 LIMIT 后面
    qb.push(" LIMIT ");
    qb.push_bind(options.limit.map(i64::from).unwrap_or(-1));
    if let Some(offset) = options.offset {
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(offset));
    }
}

pub(super) fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            qb.push("NULL");
        }
        FieldValue::Int(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Float(v) => {
            qb.push_bind(*v);
        }
        FieldValue::Text(v) => {
            qb.push_bind(v.clone());
        }
    }
}

pub(super) fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, predicate: &Predicate) {
    match predicate {
        Predicate::True => {
            qb.push("1 = 1");
        }
        Predicate::False => {
            qb.push("1 = 0");
        }
        Predicate::Eq(field, FieldValue::Null) | Predicate::IsNull(field) => {
            qb.push(format!("{} IS NULL", field.column()));
        }
        Predicate::NotNull(field) => {
            qb.push(format!("{} IS NOT NULL", field.column()));
        }
        Predicate::Eq(field, value) => {
            qb.push(format!("{} = ", field.column()));
            push_value(qb, value);
        }
        Predicate::In(_, ids) if ids.is_empty() => {
            qb.push("1 = 0");
        }
        Predicate::In(field, ids) if ids.len() > INLINE_IN_LIMIT => {
            // SQLite 绑定参数上限 32766，大集合作为一个 JSON 数组绑定
            let array = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
            qb.push(format!("{} IN (SELECT value FROM json_each(", field.column()));
            qb.push_bind(format!("[{array}]"));
            qb.push("))");
        }
        Predicate::In(field, ids) => {
            qb.push(format!("{} IN (", field.column()));
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
            qb.push(")");
        }
        Predicate::Contains { fields, needle } => {
            // LOWER() 只处理 ASCII，改用 Unicode 感知的 REGEXP
            let pattern = contains_pattern(needle);
            qb.push("(");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("{} REGEXP ", field.column()));
                qb.push_bind(pattern.clone());
            }
            if fields.is_empty() {
                qb.push("1 = 0");
            }
            qb.push(")");
        }
        Predicate::Range {
            field,
            lower,
            upper,
        } => {
            qb.push("(");
            let mut first = true;
            let mut push_bound = |qb: &mut QueryBuilder<'_, Sqlite>, bound: &Bound, op: &str| {
                if !first {
                    qb.push(" AND ");
                }
                first = false;
                qb.push(format!("{} {op} ", field.column()));
                push_value(qb, &bound.value);
            };
            if let Some(b) = lower {
                push_bound(qb, b, if b.inclusive { ">=" } else { ">" });
            }
            if let Some(b) = upper {
                push_bound(qb, b, if b.inclusive { "<=" } else { "<" });
            }
            if lower.is_none() && upper.is_none() {
                qb.push("1 = 1");
            }
            qb.push(")");
        }
        Predicate::And(parts) => {
            qb.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_predicate(qb, part);
            }
            if parts.is_empty() {
                qb.push("1 = 1");
            }
            qb.push(")");
        }
    }
}

/// Case-insensitive literal substring pattern for `REGEXP`
fn contains_pattern(needle: &str) -> String {
    format!("(?i){}", regex::escape(needle))
}

/// `UPDATE <table> SET a = ?, b = ? WHERE id = ?`
pub(super) fn update<'a>(
    resource: ResourceType,
    id: i64,
    changes: &[(Field, FieldValue)],
) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", resource.table()));
    for (i, (field, value)) in changes.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("{} = ", field.column()));
        push_value(&mut qb, value);
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_sql_uses_placeholders() {
        let filter = Predicate::eq(Field::Status, "shipped")
            .and(Predicate::in_ids(Field::Id, [3, 1]))
            .and(Predicate::contains(&[Field::Reference], "50%"));
        let qb = select(ResourceType::Order, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT id, reference, customer_id, status, total_amount, created_at FROM orders \
             WHERE (status = ? AND id IN (?, ?) AND (reference REGEXP ?))"
        );
    }

    #[test]
    fn test_false_predicate_matches_nothing() {
        let qb = count(ResourceType::Product, &Predicate::False);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM products WHERE 1 = 0");
    }

    #[test]
    fn test_contains_pattern_is_literal() {
        assert_eq!(contains_pattern("50%"), "(?i)50%");
        assert_eq!(contains_pattern("a.b*"), "(?i)a\\.b\\*");
    }

    #[test]
    fn test_large_id_set_binds_one_parameter() {
        let filter = Predicate::in_ids(Field::ProductId, 1..=2_000);
        let qb = count(ResourceType::OrderItem, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM order_items WHERE product_id IN (SELECT value FROM json_each(?))"
        );
    }

    #[test]
    fn test_range_and_ordering() {
        let filter = Predicate::range(
            Field::CreatedAt,
            Some(Bound::inclusive(10i64)),
            Some(Bound::exclusive(20i64)),
        );
        let mut qb = select(ResourceType::Customer, &filter);
        push_options(&mut qb, ResourceType::Customer, &FindOptions::page(2, 10));
        assert_eq!(
            qb.sql(),
            "SELECT id, name, email, created_at FROM customers \
             WHERE (created_at >= ? AND created_at < ?) \
             ORDER BY created_at IS NULL, created_at DESC, id ASC LIMIT ? OFFSET ?"
        );
    }
}
