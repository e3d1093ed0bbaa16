use crate::models::coupon::Coupon;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One station's block of coupons in the trading API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationCoupons {
    /// Trading system the station belongs to.
    pub system: i64,
    /// Station number within the system.
    pub number: i64,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

/// Fuel or service item sold through the trading network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingService {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Price of one service at a station on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrice {
    pub service_id: i64,
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Station reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub system: i64,
    pub number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_count: Option<i32>,
}

/// Credentials payload for the trading API login endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Time window for coupon queries, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub dt_beg: DateTime<Utc>,
    pub dt_end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(dt_beg: DateTime<Utc>, dt_end: DateTime<Utc>) -> Self {
        Self { dt_beg, dt_end }
    }
}
