use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Read,
    Write,
    Delete,
    Manage,
    ViewMenu,
}

impl std::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionAction::Read => write!(f, "read"),
            PermissionAction::Write => write!(f, "write"),
            PermissionAction::Delete => write!(f, "delete"),
            PermissionAction::Manage => write!(f, "manage"),
            PermissionAction::ViewMenu => write!(f, "view_menu"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "starts_with")]
    StartsWith,
}

/// Contextual restriction attached to a permission.
///
/// `field` is a dotted path into the evaluation context; all conditions in a
/// list must hold for the permission to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCondition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

impl PermissionCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Grant of a set of actions on a `(section, resource)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub section: String,
    pub resource: String,
    pub actions: Vec<PermissionAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<PermissionCondition>>,
}

impl Permission {
    pub fn new(
        section: impl Into<String>,
        resource: impl Into<String>,
        actions: Vec<PermissionAction>,
    ) -> Self {
        Self {
            section: section.into(),
            resource: resource.into(),
            actions,
            conditions: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<PermissionCondition>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn allows(&self, action: PermissionAction) -> bool {
        self.actions.contains(&action)
    }

    /// A grant on every section or every resource.
    pub fn is_wildcard(&self) -> bool {
        self.section == "*" || self.resource == "*"
    }

    pub fn key(&self) -> PermissionKey {
        PermissionKey {
            section: self.section.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// Value-object key for the effective-permission map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionKey {
    pub section: String,
    pub resource: String,
}

impl PermissionKey {
    pub fn new(section: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            resource: resource.into(),
        }
    }
}

/// One entry of a combined permission check.
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub section: String,
    pub resource: String,
    pub action: PermissionAction,
    pub context: Option<Value>,
}

impl PermissionRequest {
    pub fn new(
        section: impl Into<String>,
        resource: impl Into<String>,
        action: PermissionAction,
    ) -> Self {
        Self {
            section: section.into(),
            resource: resource.into(),
            action,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}
