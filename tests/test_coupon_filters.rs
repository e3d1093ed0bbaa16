/// Coupon filtering: every filter recomputes group aggregates and drops
/// emptied station groups.
mod helpers;

use chrono::Duration;
use fuelops::models::*;
use helpers::*;

#[test]
fn test_age_filter_old_keeps_only_old_coupons() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![
        station(
            15,
            4,
            vec![
                coupon("OLD-1", 10, 500.0, CouponState::Active),
                coupon("NEW-1", 1, 300.0, CouponState::Active),
            ],
        ),
        station(15, 5, vec![coupon("NEW-2", 2, 200.0, CouponState::Active)]),
    ]);

    let filters = CouponFilters {
        age_filter: Some(AgeFilter::Old),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    // Station 5 had only fresh coupons and disappears entirely.
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].station_id, 4);
    assert_eq!(filtered[0].total_count, 1);
    assert!(filtered[0].coupons.iter().all(|c| c.is_old));
    assert_eq!(filtered[0].total_debt, 500.0);
}

#[test]
fn test_state_filter_is_exact() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![station(
        15,
        4,
        vec![
            coupon("A", 1, 100.0, CouponState::Active),
            coupon("R", 1, 200.0, CouponState::Redeemed),
        ],
    )]);

    let filters = CouponFilters {
        state: Some(CouponState::Redeemed),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    assert_eq!(filtered[0].total_count, 1);
    assert_eq!(filtered[0].coupons[0].coupon.number, "R");
    // Redeemed coupons carry no debt.
    assert_eq!(filtered[0].total_debt, 0.0);
}

#[test]
fn test_search_is_case_insensitive_substring() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![station(
        15,
        4,
        vec![
            coupon("AZS-001", 1, 100.0, CouponState::Active),
            coupon("azs-777", 1, 100.0, CouponState::Active),
            coupon("K-5", 1, 100.0, CouponState::Active),
        ],
    )]);

    let filters = CouponFilters {
        search: Some("AZS".to_string()),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    assert_eq!(filtered[0].total_count, 2);
}

#[test]
fn test_rest_range_is_inclusive() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![station(
        15,
        4,
        vec![
            coupon("LOW", 1, 50.0, CouponState::Active),
            coupon("MID", 1, 100.0, CouponState::Active),
            coupon("HIGH", 1, 300.0, CouponState::Active),
        ],
    )]);

    let filters = CouponFilters {
        min_rest: Some(100.0),
        max_rest: Some(300.0),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    let numbers: Vec<&str> = filtered[0]
        .coupons
        .iter()
        .map(|c| c.coupon.number.as_str())
        .collect();
    assert_eq!(numbers, vec!["MID", "HIGH"]);
}

#[test]
fn test_date_range_is_inclusive_on_dt_beg() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![station(
        15,
        4,
        vec![
            coupon("D-1", 1, 100.0, CouponState::Active),
            coupon("D-5", 5, 100.0, CouponState::Active),
            coupon("D-20", 20, 100.0, CouponState::Active),
        ],
    )]);

    let filters = CouponFilters {
        date_from: Some(fixed_now() - Duration::days(5)),
        date_to: Some(fixed_now()),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    let numbers: Vec<&str> = filtered[0]
        .coupons
        .iter()
        .map(|c| c.coupon.number.as_str())
        .collect();
    assert_eq!(numbers, vec!["D-1", "D-5"]);
}

#[test]
fn test_age_filter_today_uses_midnight_boundary() {
    let service = monitoring_service();
    // fixed_now is 12:00; a coupon 6 hours old was issued today, one 13 hours
    // old was issued yesterday evening.
    let mut this_morning = coupon("TODAY", 0, 100.0, CouponState::Active);
    this_morning.dt_beg = fixed_now() - Duration::hours(6);
    let mut last_evening = coupon("YESTERDAY", 0, 100.0, CouponState::Active);
    last_evening.dt_beg = fixed_now() - Duration::hours(13);

    let groups = service.group_by_station(vec![station(15, 4, vec![this_morning, last_evening])]);

    let filters = CouponFilters {
        age_filter: Some(AgeFilter::Today),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    assert_eq!(filtered[0].total_count, 1);
    assert_eq!(filtered[0].coupons[0].coupon.number, "TODAY");
}

#[test]
fn test_age_filter_week_and_month_windows() {
    let service = monitoring_service();
    let build = |svc: &fuelops::services::CouponService| {
        svc.group_by_station(vec![station(
            15,
            4,
            vec![
                coupon("D-2", 2, 100.0, CouponState::Active),
                coupon("D-10", 10, 100.0, CouponState::Active),
                coupon("D-40", 40, 100.0, CouponState::Active),
            ],
        )])
    };

    let week = service.apply_filters(
        build(&service),
        &CouponFilters {
            age_filter: Some(AgeFilter::Week),
            ..Default::default()
        },
    );
    assert_eq!(week[0].total_count, 1);

    let month = service.apply_filters(
        build(&service),
        &CouponFilters {
            age_filter: Some(AgeFilter::Month),
            ..Default::default()
        },
    );
    assert_eq!(month[0].total_count, 2);
}

#[test]
fn test_combined_filters_intersect() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![station(
        15,
        4,
        vec![
            coupon("AZS-OLD", 10, 500.0, CouponState::Active),
            coupon("AZS-NEW", 1, 500.0, CouponState::Active),
            coupon("K-OLD", 10, 500.0, CouponState::Active),
        ],
    )]);

    let filters = CouponFilters {
        search: Some("azs".to_string()),
        age_filter: Some(AgeFilter::Old),
        ..Default::default()
    };
    let filtered = service.apply_filters(groups, &filters);

    assert_eq!(filtered[0].total_count, 1);
    assert_eq!(filtered[0].coupons[0].coupon.number, "AZS-OLD");
}

#[test]
fn test_empty_filters_keep_everything() {
    let service = monitoring_service();
    let groups = service.group_by_station(vec![station(
        15,
        4,
        vec![
            coupon("A", 1, 100.0, CouponState::Active),
            coupon("B", 10, 200.0, CouponState::Redeemed),
        ],
    )]);

    let filtered = service.apply_filters(groups.clone(), &CouponFilters::default());
    assert_eq!(filtered, groups);
}
