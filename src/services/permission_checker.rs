use crate::models::{
    Permission, PermissionAction, PermissionCondition, PermissionKey, PermissionRequest,
    ConditionOperator, RoleScope, User, UserRole, UserStatus,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Membership lookup from trading points to the network that owns them.
pub trait NetworkTopology: Send + Sync {
    fn network_of(&self, trading_point_id: &str) -> Option<String>;
}

/// Pure evaluation of "can this user perform this action".
///
/// Role-derived and direct permissions are merged into one effective set;
/// no I/O happens here.
#[derive(Clone, Default)]
pub struct PermissionChecker {
    topology: Option<Arc<dyn NetworkTopology>>,
}

impl PermissionChecker {
    pub fn new() -> Self {
        Self { topology: None }
    }

    pub fn with_topology(topology: Arc<dyn NetworkTopology>) -> Self {
        Self {
            topology: Some(topology),
        }
    }

    /// Check a `(section, resource, action)` tuple for a user.
    ///
    /// Only `active` users hold permissions. A wildcard grant (`section` or
    /// `resource` of `*`) short-circuits; otherwise an exact
    /// `(section, resource)` match must carry the action and satisfy all of
    /// its conditions against the supplied context.
    pub fn has_permission(
        &self,
        user: Option<&User>,
        section: &str,
        resource: &str,
        action: PermissionAction,
        context: Option<&Value>,
    ) -> bool {
        let Some(user) = user else {
            return false;
        };
        if user.status != UserStatus::Active {
            debug!(user_id = %user.id, status = %user.status, "permission denied for non-active user");
            return false;
        }

        let effective = self.effective_permissions(user);

        if effective.values().any(Permission::is_wildcard) {
            return true;
        }

        let key = PermissionKey::new(section, resource);
        match effective.get(&key) {
            Some(permission) if permission.allows(action) => match &permission.conditions {
                Some(conditions) => conditions
                    .iter()
                    .all(|condition| evaluate_condition(condition, context)),
                None => true,
            },
            _ => false,
        }
    }

    /// OR combinator over a list of permission requests.
    pub fn has_any_permission(&self, user: Option<&User>, requests: &[PermissionRequest]) -> bool {
        requests.iter().any(|request| {
            self.has_permission(
                user,
                &request.section,
                &request.resource,
                request.action,
                request.context.as_ref(),
            )
        })
    }

    /// AND combinator over a list of permission requests.
    pub fn has_all_permissions(&self, user: Option<&User>, requests: &[PermissionRequest]) -> bool {
        requests.iter().all(|request| {
            self.has_permission(
                user,
                &request.section,
                &request.resource,
                request.action,
                request.context.as_ref(),
            )
        })
    }

    /// Merge role-derived and direct permissions into a map keyed by
    /// `(section, resource)`.
    ///
    /// Actions are unioned. For conditions on the same key: an unconditional
    /// grant on either side clears them (the broadest grant wins); when both
    /// sides are conditional the later one wins, and direct permissions are
    /// folded in after role permissions so theirs take precedence.
    pub fn effective_permissions(&self, user: &User) -> HashMap<PermissionKey, Permission> {
        let mut merged: HashMap<PermissionKey, Permission> = HashMap::new();

        let role_permissions = user.roles.iter().flat_map(|role| role.permissions.iter());
        for permission in role_permissions.chain(user.direct_permissions.iter()) {
            match merged.entry(permission.key()) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    for action in &permission.actions {
                        if !existing.actions.contains(action) {
                            existing.actions.push(*action);
                        }
                    }
                    existing.conditions =
                        match (existing.conditions.take(), permission.conditions.clone()) {
                            (None, _) | (_, None) => None,
                            (Some(_), Some(incoming)) => Some(incoming),
                        };
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(permission.clone());
                }
            }
        }

        merged
    }

    /// Scope gate, independent of the action-level permission check.
    ///
    /// `global` roles reach everything. Same-scope requests compare the
    /// role's `scope_value` (unset binds to all values). A `network`-scoped
    /// role reaching into a trading point consults the topology; without one
    /// the membership is unknown and the check falls back to allow.
    pub fn check_scope_access(
        &self,
        role: &UserRole,
        requested_scope: RoleScope,
        requested_value: Option<&str>,
    ) -> bool {
        if role.scope == RoleScope::Global {
            return true;
        }

        if role.scope == requested_scope {
            return match (&role.scope_value, requested_value) {
                (None, _) => true,
                (Some(bound), Some(requested)) => bound == requested,
                (Some(_), None) => false,
            };
        }

        if role.scope == RoleScope::Network && requested_scope == RoleScope::TradingPoint {
            return match (&self.topology, &role.scope_value, requested_value) {
                (Some(topology), Some(network_id), Some(trading_point)) => {
                    topology.network_of(trading_point).as_deref() == Some(network_id)
                }
                _ => true,
            };
        }

        false
    }
}

/// Evaluate one condition against the context.
///
/// The field is a dotted path; a missing path resolves to null, which fails
/// every operator except equality with an explicitly-null expected value.
fn evaluate_condition(condition: &PermissionCondition, context: Option<&Value>) -> bool {
    let actual = context
        .and_then(|ctx| lookup_path(ctx, &condition.field))
        .cloned()
        .unwrap_or(Value::Null);

    match condition.operator {
        ConditionOperator::Equals => actual == condition.value,
        ConditionOperator::NotEquals => actual != condition.value,
        ConditionOperator::In => match &condition.value {
            Value::Array(expected) => expected.contains(&actual),
            _ => false,
        },
        ConditionOperator::NotIn => match &condition.value {
            Value::Array(expected) => !expected.contains(&actual),
            _ => false,
        },
        ConditionOperator::Contains => match (&actual, &condition.value) {
            (Value::Array(items), expected) => items.contains(expected),
            (Value::String(actual), Value::String(expected)) => actual.contains(expected),
            _ => false,
        },
        ConditionOperator::StartsWith => match (&actual, &condition.value) {
            (Value::String(actual), Value::String(expected)) => actual.starts_with(expected),
            _ => false,
        },
    }
}

fn lookup_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}
