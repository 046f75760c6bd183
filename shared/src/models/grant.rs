//! Permission grant model

use super::ParseModelError;
use super::principal::RoleId;
use super::resource::{Operation, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Restriction attached to a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionTag {
    /// Only records whose `created_by` is the caller
    IsCreator,
}

impl ConditionTag {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IsCreator => "is-creator",
        }
    }
}

impl fmt::Display for ConditionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionTag {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "is-creator" => Ok(Self::IsCreator),
            other => Err(ParseModelError::new("condition", other)),
        }
    }
}

/// A stored grant: role may perform operation on resource, subject to conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub role_id: RoleId,
    pub resource: ResourceType,
    pub operation: Operation,
    #[serde(default)]
    pub conditions: BTreeSet<ConditionTag>,
}

impl PermissionGrant {
    pub fn new(role_id: RoleId, resource: ResourceType, operation: Operation) -> Self {
        Self {
            role_id,
            resource,
            operation,
            conditions: BTreeSet::new(),
        }
    }

    pub fn with_condition(mut self, tag: ConditionTag) -> Self {
        self.conditions.insert(tag);
        self
    }

    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
    }
}
