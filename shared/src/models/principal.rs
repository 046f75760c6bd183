//! Principal and Role Models

use serde::{Deserialize, Serialize};

pub type PrincipalId = i64;
pub type RoleId = i64;

/// Role entity (RBAC 角色)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Super admin bypasses every grant lookup
    #[serde(default)]
    pub is_super_admin: bool,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_super_admin: false,
        }
    }

    pub fn super_admin(id: RoleId) -> Self {
        Self {
            id,
            name: "super_admin".to_string(),
            is_super_admin: true,
        }
    }
}

/// Authenticated caller, built once per request by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(id: PrincipalId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id,
            username: username.into(),
            roles,
        }
    }

    /// 是否超级管理员 (任一角色带 super admin 标记)
    pub fn is_super_admin(&self) -> bool {
        self.roles.iter().any(|r| r.is_super_admin)
    }

    pub fn role_ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(|r| r.id).collect()
    }
}
