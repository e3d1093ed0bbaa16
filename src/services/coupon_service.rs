use crate::models::{
    AgeFilter, AlertKind, AlertSeverity, Coupon, CouponAlert, CouponFilters, CouponPriority,
    CouponState, CouponWithAge, CouponsStationGroup, CouponsStats, MonitoringConfig,
    StationCoupons,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Source of the evaluation instant for age arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant, for deterministic evaluation.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Aggregation and monitoring over coupon reports.
///
/// Pure and synchronous: every method is deterministic given its inputs and
/// the clock's instant.
#[derive(Clone)]
pub struct CouponService {
    config: MonitoringConfig,
    clock: Arc<dyn Clock>,
}

impl CouponService {
    pub fn new(config: MonitoringConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(config: MonitoringConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    // ========================================
    // Enrichment & grouping
    // ========================================

    /// Attach age and priority attributes to a coupon.
    ///
    /// Priority is evaluated in fixed early-exit order: critical age or a
    /// large outstanding amount, then old age or half the large-amount
    /// threshold, then normal.
    pub fn enrich_with_age(&self, coupon: Coupon) -> CouponWithAge {
        let elapsed = self.clock.now().signed_duration_since(coupon.dt_beg);
        let age_days = elapsed.num_days();
        let age_hours = elapsed.num_hours();

        let is_old = age_days > self.config.old_coupon_threshold_days;
        let is_critical = age_days > self.config.critical_coupon_threshold_days;

        let priority = if is_critical || coupon.rest > self.config.large_amount_threshold {
            CouponPriority::Critical
        } else if is_old || coupon.rest > self.config.large_amount_threshold / 2.0 {
            CouponPriority::Attention
        } else {
            CouponPriority::Normal
        };

        CouponWithAge {
            coupon,
            age_days,
            age_hours,
            is_old,
            is_critical,
            priority,
        }
    }

    /// Group station coupon blocks by `(system, station)` and compute
    /// per-group aggregates.
    pub fn group_by_station(&self, stations: Vec<StationCoupons>) -> Vec<CouponsStationGroup> {
        let mut grouped: BTreeMap<(i64, i64), Vec<CouponWithAge>> = BTreeMap::new();

        for station in stations {
            let entry = grouped.entry((station.system, station.number)).or_default();
            entry.extend(
                station
                    .coupons
                    .into_iter()
                    .map(|coupon| self.enrich_with_age(coupon)),
            );
        }

        grouped
            .into_iter()
            .map(|((system_id, station_id), coupons)| {
                Self::build_group(system_id, station_id, coupons)
            })
            .collect()
    }

    fn build_group(
        system_id: i64,
        station_id: i64,
        coupons: Vec<CouponWithAge>,
    ) -> CouponsStationGroup {
        let total_debt = coupons
            .iter()
            .filter(|c| c.coupon.state == CouponState::Active)
            .map(|c| c.coupon.rest)
            .sum();
        let active_count = coupons
            .iter()
            .filter(|c| c.coupon.state == CouponState::Active)
            .count();
        let old_count = coupons.iter().filter(|c| c.is_old).count();
        let critical_count = coupons.iter().filter(|c| c.is_critical).count();
        let total_count = coupons.len();

        CouponsStationGroup {
            system_id,
            station_id,
            coupons,
            total_debt,
            active_count,
            old_count,
            critical_count,
            total_count,
        }
    }

    // ========================================
    // Filtering
    // ========================================

    /// Filter grouped coupons and recompute group aggregates.
    ///
    /// Groups left with zero coupons are dropped.
    pub fn apply_filters(
        &self,
        groups: Vec<CouponsStationGroup>,
        filters: &CouponFilters,
    ) -> Vec<CouponsStationGroup> {
        let now = self.clock.now();
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        groups
            .into_iter()
            .filter_map(|group| {
                let kept: Vec<CouponWithAge> = group
                    .coupons
                    .into_iter()
                    .filter(|c| Self::matches(c, filters, now, midnight))
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(Self::build_group(group.system_id, group.station_id, kept))
                }
            })
            .collect()
    }

    fn matches(
        enriched: &CouponWithAge,
        filters: &CouponFilters,
        now: DateTime<Utc>,
        midnight: DateTime<Utc>,
    ) -> bool {
        let coupon = &enriched.coupon;

        if let Some(state) = filters.state {
            if coupon.state != state {
                return false;
            }
        }
        if let Some(from) = filters.date_from {
            if coupon.dt_beg < from {
                return false;
            }
        }
        if let Some(to) = filters.date_to {
            if coupon.dt_beg > to {
                return false;
            }
        }
        if let Some(search) = &filters.search {
            if !coupon
                .number
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if let Some(min) = filters.min_rest {
            if coupon.rest < min {
                return false;
            }
        }
        if let Some(max) = filters.max_rest {
            if coupon.rest > max {
                return false;
            }
        }
        if let Some(age) = filters.age_filter {
            let keep = match age {
                AgeFilter::Today => coupon.dt_beg >= midnight,
                AgeFilter::Week => coupon.dt_beg >= now - Duration::days(7),
                AgeFilter::Month => coupon.dt_beg >= now - Duration::days(30),
                AgeFilter::Old => enriched.is_old,
            };
            if !keep {
                return false;
            }
        }

        true
    }

    // ========================================
    // Statistics & alerts
    // ========================================

    /// Network-wide totals over the (possibly filtered) groups.
    pub fn calculate_stats(&self, groups: &[CouponsStationGroup]) -> CouponsStats {
        CouponsStats {
            stations_count: groups.len(),
            total_coupons: groups.iter().map(|g| g.total_count).sum(),
            active_coupons: groups.iter().map(|g| g.active_count).sum(),
            old_coupons_count: groups.iter().map(|g| g.old_count).sum(),
            critical_coupons_count: groups.iter().map(|g| g.critical_count).sum(),
            total_debt: groups.iter().map(|g| g.total_debt).sum(),
        }
    }

    /// Per-station alerts for old coupons, critical coupons and large
    /// outstanding amounts.
    ///
    /// The three conditions are independent; a station can raise all of
    /// them at once. Sorted by severity, then by count.
    pub fn generate_alerts(&self, groups: &[CouponsStationGroup]) -> Vec<CouponAlert> {
        let mut alerts = Vec::new();

        for group in groups {
            if group.old_count > 0 {
                let amount: f64 = group
                    .coupons
                    .iter()
                    .filter(|c| c.is_old)
                    .map(|c| c.coupon.rest)
                    .sum();
                alerts.push(CouponAlert {
                    severity: AlertSeverity::Warning,
                    kind: AlertKind::OldCoupons,
                    system_id: group.system_id,
                    station_id: group.station_id,
                    count: group.old_count,
                    amount,
                    message: format!(
                        "Station {}/{}: {} coupons older than {} days",
                        group.system_id,
                        group.station_id,
                        group.old_count,
                        self.config.old_coupon_threshold_days
                    ),
                });
            }

            if group.critical_count > 0 {
                let amount: f64 = group
                    .coupons
                    .iter()
                    .filter(|c| c.is_critical)
                    .map(|c| c.coupon.rest)
                    .sum();
                alerts.push(CouponAlert {
                    severity: AlertSeverity::Critical,
                    kind: AlertKind::CriticalCoupons,
                    system_id: group.system_id,
                    station_id: group.station_id,
                    count: group.critical_count,
                    amount,
                    message: format!(
                        "Station {}/{}: {} coupons older than {} days",
                        group.system_id,
                        group.station_id,
                        group.critical_count,
                        self.config.critical_coupon_threshold_days
                    ),
                });
            }

            let large: Vec<&CouponWithAge> = group
                .coupons
                .iter()
                .filter(|c| c.coupon.rest > self.config.large_amount_threshold)
                .collect();
            if !large.is_empty() {
                let amount: f64 = large.iter().map(|c| c.coupon.rest).sum();
                alerts.push(CouponAlert {
                    severity: AlertSeverity::Warning,
                    kind: AlertKind::LargeAmount,
                    system_id: group.system_id,
                    station_id: group.station_id,
                    count: large.len(),
                    amount,
                    message: format!(
                        "Station {}/{}: {} coupons with balance above {}",
                        group.system_id,
                        group.station_id,
                        large.len(),
                        self.config.large_amount_threshold
                    ),
                });
            }
        }

        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.count.cmp(&a.count))
        });

        if !alerts.is_empty() {
            info!(count = alerts.len(), "coupon monitoring raised alerts");
        }

        alerts
    }

    /// Stations with the highest outstanding debt, descending.
    pub fn top_stations_by_debt(
        &self,
        groups: &[CouponsStationGroup],
        limit: usize,
    ) -> Vec<CouponsStationGroup> {
        let mut sorted = groups.to_vec();
        sorted.sort_by(|a, b| {
            b.total_debt
                .partial_cmp(&a.total_debt)
                .unwrap_or(Ordering::Equal)
        });
        sorted.truncate(limit);
        sorted
    }

    /// Coupons with the highest outstanding balance, descending.
    pub fn top_coupons_by_rest(
        &self,
        groups: &[CouponsStationGroup],
        limit: usize,
    ) -> Vec<CouponWithAge> {
        let mut coupons: Vec<CouponWithAge> = groups
            .iter()
            .flat_map(|g| g.coupons.iter().cloned())
            .collect();
        coupons.sort_by(|a, b| {
            b.coupon
                .rest
                .partial_cmp(&a.coupon.rest)
                .unwrap_or(Ordering::Equal)
        });
        coupons.truncate(limit);
        coupons
    }

    // ========================================
    // Export
    // ========================================

    /// Serialize grouped coupons to CSV: header plus one row per coupon.
    ///
    /// Every field is double-quoted; embedded quotes are doubled.
    pub fn export_csv(&self, groups: &[CouponsStationGroup]) -> String {
        let header = [
            "system",
            "station",
            "number",
            "dt_beg",
            "pos",
            "shift",
            "opernum",
            "summ_total",
            "summ_used",
            "rest",
            "state",
            "age_days",
            "priority",
        ];

        let mut lines = Vec::new();
        lines.push(
            header
                .iter()
                .map(|f| csv_field(f))
                .collect::<Vec<_>>()
                .join(","),
        );

        for group in groups {
            for c in &group.coupons {
                let fields = [
                    group.system_id.to_string(),
                    group.station_id.to_string(),
                    c.coupon.number.clone(),
                    c.coupon.dt_beg.to_rfc3339(),
                    c.coupon.pos.to_string(),
                    c.coupon.shift.to_string(),
                    c.coupon.opernum.to_string(),
                    c.coupon.summ_total.to_string(),
                    c.coupon.summ_used.to_string(),
                    c.coupon.rest.to_string(),
                    c.coupon.state.to_string(),
                    c.age_days.to_string(),
                    c.priority.to_string(),
                ];
                lines.push(
                    fields
                        .iter()
                        .map(|f| csv_field(f))
                        .collect::<Vec<_>>()
                        .join(","),
                );
            }
        }

        lines.join("\n")
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
