#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use fuelops::models::*;
use fuelops::services::{CouponService, FixedClock};
use std::sync::Arc;

/// Opt-in test logging: `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Fixed evaluation instant shared by the coupon tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
}

/// Coupon service with default thresholds pinned to `fixed_now`.
pub fn monitoring_service() -> CouponService {
    CouponService::with_clock(
        MonitoringConfig::default(),
        Arc::new(FixedClock(fixed_now())),
    )
}

pub fn coupon(number: &str, days_old: i64, rest: f64, state: CouponState) -> Coupon {
    Coupon {
        number: number.to_string(),
        dt_beg: fixed_now() - Duration::days(days_old),
        pos: 1,
        shift: 3,
        opernum: 5000 + days_old,
        summ_total: rest + 200.0,
        summ_used: 200.0,
        rest,
        state,
    }
}

pub fn station(system: i64, number: i64, coupons: Vec<Coupon>) -> StationCoupons {
    StationCoupons {
        system,
        number,
        coupons,
    }
}

pub fn permission(section: &str, resource: &str, actions: &[PermissionAction]) -> Permission {
    Permission::new(section, resource, actions.to_vec())
}

pub fn role(name: &str, permissions: Vec<Permission>) -> UserRole {
    UserRole::new(name.to_string(), RoleScope::Global, None).with_permissions(permissions)
}

pub fn scoped_role(
    name: &str,
    scope: RoleScope,
    scope_value: Option<&str>,
    permissions: Vec<Permission>,
) -> UserRole {
    UserRole::new(name.to_string(), scope, scope_value.map(str::to_string))
        .with_permissions(permissions)
}

pub fn user_with_roles(email: &str, roles: Vec<UserRole>) -> User {
    let mut user = User::new(email.to_string());
    user.roles = roles;
    user
}
