//! Tri-state visibility scope

use serde::Serialize;
use shared::models::EntityId;
use std::collections::BTreeSet;

/// Set of records of one resource type a principal may see
///
/// `Restricted` is never empty: [`VisibilityScope::restricted`] collapses an
/// empty id set to `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ids", rename_all = "snake_case")]
pub enum VisibilityScope {
    Unrestricted,
    Restricted(BTreeSet<EntityId>),
    Empty,
}

impl VisibilityScope {
    pub fn restricted(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let ids: BTreeSet<EntityId> = ids.into_iter().collect();
        if ids.is_empty() {
            Self::Empty
        } else {
            Self::Restricted(ids)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Restricted(ids) => ids.is_empty(),
            Self::Unrestricted => false,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    pub fn ids(&self) -> Option<&BTreeSet<EntityId>> {
        match self {
            Self::Restricted(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Restricted(ids) => ids.contains(&id),
            Self::Empty => false,
        }
    }

    /// Records visible under both scopes
    pub fn intersect(&self, other: &VisibilityScope) -> VisibilityScope {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => Self::Empty,
            (Self::Unrestricted, s) | (s, Self::Unrestricted) => s.clone(),
            (Self::Restricted(a), Self::Restricted(b)) => {
                Self::restricted(a.intersection(b).copied())
            }
        }
    }

    /// Short form for logs: `unrestricted`, `empty`, `restricted(3)`
    pub fn describe(&self) -> String {
        match self {
            Self::Unrestricted => "unrestricted".to_string(),
            Self::Empty => "empty".to_string(),
            Self::Restricted(ids) => format!("restricted({})", ids.len()),
        }
    }
}
