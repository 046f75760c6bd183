//! Filter compilation
//!
//! Turns query-string filters into a [`Predicate`] per resource and combines
//! it with a [`VisibilityScope`].

use shared::models::{Field, OrderStatus, ResourceType};

use super::predicate::{Bound, Predicate};
use crate::scope::VisibilityScope;
use crate::utils::{AppError, AppResult};

/// User-supplied list filters, already parsed (timestamps in Unix millis)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilters {
    pub search: Option<String>,
    pub status: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub date_from: Option<i64>,
    /// Exclusive upper bound on `created_at`
    pub date_to: Option<i64>,
    /// Inclusive bounds on the resource's money column
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl UserFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct FilterCompiler;

impl FilterCompiler {
    /// Combine a scope with an already translated user predicate.
    ///
    /// `Empty` yields [`Predicate::False`], which callers detect with
    /// [`Predicate::is_unsatisfiable`] before touching storage.
    pub fn compile(scope: &VisibilityScope, user: Predicate) -> Predicate {
        match scope {
            VisibilityScope::Empty => Predicate::False,
            VisibilityScope::Unrestricted => user,
            VisibilityScope::Restricted(ids) => {
                user.and(Predicate::in_ids(Field::Id, ids.iter().copied()))
            }
        }
    }

    /// Translate user filters for `resource`, independent of any scope
    pub fn translate(resource: ResourceType, filters: &UserFilters) -> AppResult<Predicate> {
        let mut parts = Vec::new();

        if let Some(term) = filters.search.as_deref().map(str::trim)
            && !term.is_empty()
        {
            let fields = search_fields(resource);
            if fields.is_empty() {
                return Err(unsupported(resource, "search"));
            }
            parts.push(Predicate::contains(fields, term));
        }

        if let Some(status) = filters.status.as_deref().map(str::trim)
            && !status.is_empty()
        {
            parts.push(status_predicate(resource, status)?);
        }

        if filters.date_from.is_some() || filters.date_to.is_some() {
            if !resource.has_field(Field::CreatedAt) {
                return Err(unsupported(resource, "date range"));
            }
            if let (Some(from), Some(to)) = (filters.date_from, filters.date_to)
                && from >= to
            {
                return Err(AppError::validation("dateFrom must be before dateTo")
                    .with_detail("dateFrom", from)
                    .with_detail("dateTo", to));
            }
            parts.push(Predicate::range(
                Field::CreatedAt,
                filters.date_from.map(Bound::inclusive),
                filters.date_to.map(Bound::exclusive),
            ));
        }

        if filters.min_amount.is_some() || filters.max_amount.is_some() {
            let Some(field) = amount_field(resource) else {
                return Err(unsupported(resource, "amount range"));
            };
            let finite = |v: Option<f64>| v.is_none_or(f64::is_finite);
            if !finite(filters.min_amount) || !finite(filters.max_amount) {
                return Err(AppError::validation("Amount bounds must be finite numbers"));
            }
            if let (Some(min), Some(max)) = (filters.min_amount, filters.max_amount)
                && min > max
            {
                return Err(AppError::validation("minAmount must not exceed maxAmount")
                    .with_detail("minAmount", min)
                    .with_detail("maxAmount", max));
            }
            parts.push(Predicate::range(
                field,
                filters.min_amount.map(Bound::inclusive),
                filters.max_amount.map(Bound::inclusive),
            ));
        }

        Ok(Predicate::all(parts))
    }
}

/// Text columns searched by the free-text filter
pub fn search_fields(resource: ResourceType) -> &'static [Field] {
    match resource {
        ResourceType::Product | ResourceType::Category => &[Field::Name],
        ResourceType::Customer => &[Field::Name, Field::Email],
        ResourceType::Order => &[Field::Reference],
        ResourceType::Banner => &[Field::Title],
        ResourceType::OrderItem => &[],
    }
}

/// Money column used by amount ranges
pub fn amount_field(resource: ResourceType) -> Option<Field> {
    match resource {
        ResourceType::Product => Some(Field::Price),
        ResourceType::Order => Some(Field::TotalAmount),
        ResourceType::OrderItem => Some(Field::UnitPrice),
        _ => None,
    }
}

fn status_predicate(resource: ResourceType, status: &str) -> AppResult<Predicate> {
    match resource {
        ResourceType::Order => {
            let parsed: OrderStatus = status.parse().map_err(|_| {
                AppError::validation(format!("Unknown order status '{status}'"))
                    .with_detail("status", status)
            })?;
            Ok(Predicate::eq(Field::Status, parsed))
        }
        ResourceType::Product | ResourceType::Banner => match status {
            "published" => Ok(Predicate::NotNull(Field::PublishedAt)),
            "draft" => Ok(Predicate::IsNull(Field::PublishedAt)),
            other => Err(AppError::validation(format!(
                "Unknown publication status '{other}', expected 'published' or 'draft'"
            ))),
        },
        _ => Err(unsupported(resource, "status")),
    }
}

fn unsupported(resource: ResourceType, filter: &str) -> AppError {
    AppError::validation(format!("{} does not support the {filter} filter", resource.label()))
        .with_detail("resource", resource.as_str())
}
