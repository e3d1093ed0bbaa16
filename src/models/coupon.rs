use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a fuel-value coupon, as reported by the trading API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponState {
    #[serde(rename = "Активен")]
    Active,
    #[serde(rename = "Погашен")]
    Redeemed,
    /// States the API may add without notice.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CouponState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponState::Active => write!(f, "Активен"),
            CouponState::Redeemed => write!(f, "Погашен"),
            CouponState::Unknown => write!(f, "Неизвестен"),
        }
    }
}

/// Coupon record as issued at a point-of-sale terminal.
///
/// `rest` carries the outstanding balance until the coupon is fully redeemed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub number: String,
    pub dt_beg: DateTime<Utc>,
    pub pos: i32,
    pub shift: i32,
    pub opernum: i64,
    pub summ_total: f64,
    pub summ_used: f64,
    pub rest: f64,
    pub state: CouponState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponPriority {
    Normal,
    Attention,
    Critical,
}

impl std::fmt::Display for CouponPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponPriority::Normal => write!(f, "normal"),
            CouponPriority::Attention => write!(f, "attention"),
            CouponPriority::Critical => write!(f, "critical"),
        }
    }
}

/// Coupon enriched with age and monitoring attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponWithAge {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub age_days: i64,
    pub age_hours: i64,
    pub is_old: bool,
    pub is_critical: bool,
    pub priority: CouponPriority,
}

/// Thresholds driving coupon-age and debt monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub old_coupon_threshold_days: i64,
    pub critical_coupon_threshold_days: i64,
    pub large_amount_threshold: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            old_coupon_threshold_days: 7,
            critical_coupon_threshold_days: 30,
            large_amount_threshold: 5000.0,
        }
    }
}

/// Per-station coupon group with aggregate debt statistics.
///
/// Aggregates are recomputed whenever the underlying coupon list changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponsStationGroup {
    pub system_id: i64,
    pub station_id: i64,
    pub coupons: Vec<CouponWithAge>,
    pub total_debt: f64,
    pub active_count: usize,
    pub old_count: usize,
    pub critical_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeFilter {
    Today,
    Week,
    Month,
    Old,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponFilters {
    pub state: Option<CouponState>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on the coupon number.
    pub search: Option<String>,
    pub min_rest: Option<f64>,
    pub max_rest: Option<f64>,
    pub age_filter: Option<AgeFilter>,
}

/// Network-wide monitoring totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CouponsStats {
    pub stations_count: usize,
    pub total_coupons: usize,
    pub active_coupons: usize,
    pub old_coupons_count: usize,
    pub critical_coupons_count: usize,
    pub total_debt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OldCoupons,
    CriticalCoupons,
    LargeAmount,
}

/// Monitoring alert for one station; the three alert kinds are independent
/// and never suppress each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponAlert {
    pub severity: AlertSeverity,
    pub kind: AlertKind,
    pub system_id: i64,
    pub station_id: i64,
    pub count: usize,
    pub amount: f64,
    pub message: String,
}
