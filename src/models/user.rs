use crate::models::permission::Permission;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Blocked,
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Inactive => write!(f, "inactive"),
            UserStatus::Blocked => write!(f, "blocked"),
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "blocked" => Ok(UserStatus::Blocked),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

/// Organizational breadth over which a role's permissions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleScope {
    Global,
    Network,
    TradingPoint,
    Assigned,
}

impl std::fmt::Display for RoleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleScope::Global => write!(f, "global"),
            RoleScope::Network => write!(f, "network"),
            RoleScope::TradingPoint => write!(f, "trading_point"),
            RoleScope::Assigned => write!(f, "assigned"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRole {
    pub id: String,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub scope: RoleScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_value: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub status: UserStatus,
    pub roles: Vec<UserRole>,
    pub direct_permissions: Vec<Permission>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRole {
    pub fn new(name: String, scope: RoleScope, scope_value: Option<String>) -> Self {
        let now = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();

        Self {
            id: Uuid::new_v4().to_string(),
            name,
            permissions: Vec::new(),
            scope,
            scope_value,
            created_at: now,
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }
}

impl User {
    pub fn new(email: String) -> Self {
        let now = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();

        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            status: UserStatus::Active,
            roles: Vec::new(),
            direct_permissions: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_direct_permission(mut self, permission: Permission) -> Self {
        self.direct_permissions.push(permission);
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }
}
