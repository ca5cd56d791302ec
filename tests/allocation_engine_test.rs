// ==========================================
// 调配引擎集成测试
// ==========================================
// 覆盖: 典型场景、无数据、单站点、平衡站点不参与、
//       STRICT / RELAXED 模式、总量溢出、算例文件求解
// ==========================================


use exam_balancer::engine::AllocationEngine;
use exam_balancer::importer::parse_dzn_file;
use exam_balancer::{
    AllocationConfig, AllocationError, AllocationOutcome, AllocationRequest, BalanceMode, Move,
    Site, SiteId,
};
use test_helpers::{fixture_path, scenario_a_sites, site};

fn strict_engine() -> AllocationEngine {
    AllocationEngine::new(AllocationConfig::default())
}

fn relaxed_engine() -> AllocationEngine {
    AllocationEngine::new(AllocationConfig::default().with_balance_mode(BalanceMode::Relaxed))
}

/// 每个调入点收到的份数不超过其缺口，每个调出点送出的份数不超过其盈余
fn assert_within_imbalance(outcome: &AllocationOutcome) {
    let plan = outcome.plan().expect("expected a solved plan");
    for donor in &plan.donors {
        let sent: i64 = plan
            .moves
            .iter()
            .filter(|m| m.from_site == donor.site_id)
            .map(|m| m.count)
            .sum();
        assert!(sent <= donor.imbalance, "donor {} over-sent", donor.site_id);
    }
    for receiver in &plan.receivers {
        let received: i64 = plan
            .moves
            .iter()
            .filter(|m| m.to_site == receiver.site_id)
            .map(|m| m.count)
            .sum();
        assert!(
            received <= receiver.imbalance,
            "receiver {} over-received",
            receiver.site_id
        );
    }
}

#[test]
fn test_scenario_a_minimal_links() {
    let outcome = strict_engine()
        .allocate(&AllocationRequest::new(scenario_a_sites()))
        .expect("allocation failed");
    let plan = outcome.plan().expect("expected a solved plan");

    assert_eq!(plan.mean, 10);
    assert_eq!(plan.total_moves, 2);
    assert_eq!(plan.exams_moved, 7);
    assert_eq!(
        plan.moves,
        vec![
            Move {
                from_site: site(3),
                to_site: site(2),
                count: 2,
            },
            Move {
                from_site: site(4),
                to_site: site(2),
                count: 5,
            },
        ]
    );
    assert!(!plan.involves(site(1)));
    assert_within_imbalance(&outcome);

    let result = outcome.to_result();
    assert_eq!(result.mean, Some(10));
    assert_eq!(result.total_moves, Some(2));
    assert_eq!(result.move_details.map(|m| m.len()), Some(2));
}

#[test]
fn test_single_site_has_no_moves() {
    let outcome = strict_engine()
        .allocate(&AllocationRequest::new(vec![Site::new(7, 5, 2)]))
        .expect("allocation failed");
    let plan = outcome.plan().expect("expected a solved plan");

    assert_eq!(plan.mean, 3);
    assert_eq!(plan.total_moves, 0);
    assert!(plan.moves.is_empty());
}

#[test]
fn test_all_evaluators_zero_is_no_data() {
    let request = AllocationRequest::new(vec![Site::new(1, 10, 0), Site::new(2, 4, 0)]);
    let outcome = strict_engine().allocate(&request).expect("allocation failed");

    assert_eq!(outcome, AllocationOutcome::NoData);
    let result = outcome.to_result();
    assert_eq!(result.mean, None);
    assert_eq!(result.total_moves, None);
    assert_eq!(result.move_details, None);
}

#[test]
fn test_empty_request_is_no_data() {
    let outcome = strict_engine()
        .allocate(&AllocationRequest::default())
        .expect("allocation failed");
    assert!(outcome.is_no_data());
}

#[test]
fn test_allocation_is_idempotent() {
    let engine = strict_engine();
    let request = AllocationRequest::new(scenario_a_sites());

    let first = engine.allocate(&request).expect("first allocation failed");
    let second = engine.allocate(&request).expect("second allocation failed");
    assert_eq!(first, second);
}

#[test]
fn test_balanced_site_never_moves() {
    // 总量 29 / 6 人 → 目标比例 5；站点 5 恰好 5 份 1 人
    let request = AllocationRequest::new(vec![
        Site::new(1, 12, 1),
        Site::new(2, 0, 1),
        Site::new(3, 6, 2),
        Site::new(4, 6, 1),
        Site::new(5, 5, 1),
    ]);
    let outcome = relaxed_engine().allocate(&request).expect("allocation failed");
    let plan = outcome.plan().expect("expected a solved plan");

    assert_eq!(plan.mean, 5);
    assert!(!plan.involves(SiteId(5)));
    assert!(plan.donors.iter().all(|d| d.site_id != SiteId(5)));
    assert!(plan.receivers.iter().all(|r| r.site_id != SiteId(5)));

    // 盈余 8 < 缺口 9：调出点全部送出，调入点不超收
    assert_eq!(plan.exams_moved, 8);
    assert_eq!(plan.total_moves, 3);
    assert_within_imbalance(&outcome);
}

#[test]
fn test_strict_mode_reports_ceiling_gap_as_infeasible() {
    let request = AllocationRequest::new(vec![
        Site::new(1, 7, 1),
        Site::new(2, 4, 1),
        Site::new(3, 0, 1),
    ]);
    let err = strict_engine().allocate(&request).unwrap_err();

    assert_eq!(
        err,
        AllocationError::Infeasible {
            surplus_total: 3,
            deficit_total: 4,
        }
    );
    assert!(!err.is_validation());
}

#[test]
fn test_relaxed_mode_solves_ceiling_gap() {
    let request = AllocationRequest::new(vec![
        Site::new(1, 7, 1),
        Site::new(2, 4, 1),
        Site::new(3, 0, 1),
    ]);
    let outcome = relaxed_engine().allocate(&request).expect("allocation failed");
    let plan = outcome.plan().expect("expected a solved plan");

    assert_eq!(plan.mean, 4);
    assert_eq!(plan.total_moves, 1);
    assert_eq!(
        plan.moves,
        vec![Move {
            from_site: site(1),
            to_site: site(3),
            count: 3,
        }]
    );
}

#[test]
fn test_duplicate_site_rejected() {
    let request = AllocationRequest::new(vec![Site::new(1, 4, 1), Site::new(1, 6, 1)]);
    let err = strict_engine().allocate(&request).unwrap_err();

    assert_eq!(err, AllocationError::DuplicateSite(1));
    assert!(err.is_validation());
}

#[test]
fn test_negative_count_rejected() {
    let request = AllocationRequest::new(vec![Site::new(1, -4, 1), Site::new(2, 6, 1)]);
    let err = strict_engine().allocate(&request).unwrap_err();
    assert!(matches!(err, AllocationError::NegativeCount { site_id: 1, .. }));
}

#[test]
fn test_strict_mode_deficit_without_donors_is_infeasible() {
    // ceil(1/2)=1：站点 1 缺口 1，没有任何调出点
    let request = AllocationRequest::new(vec![Site::new(1, 0, 1), Site::new(2, 1, 1)]);
    let err = strict_engine().allocate(&request).unwrap_err();

    assert_eq!(
        err,
        AllocationError::Infeasible {
            surplus_total: 0,
            deficit_total: 1,
        }
    );

    let outcome = relaxed_engine().allocate(&request).expect("allocation failed");
    let plan = outcome.plan().expect("expected a solved plan");
    assert_eq!(plan.total_moves, 0);
    assert!(plan.moves.is_empty());
}

#[test]
fn test_oversized_totals_rejected_without_panic() {
    let request = AllocationRequest::new(vec![Site::new(1, i64::MAX, 1), Site::new(2, 10, 1)]);
    let err = strict_engine().allocate(&request).unwrap_err();

    assert!(matches!(err, AllocationError::InvalidInput(_)));
    assert!(err.is_validation());
}

#[test]
fn test_dzn_fixture_matches_scenario_a() {
    let instance = parse_dzn_file(fixture_path("scenario_a.dzn")).expect("failed to parse fixture");
    assert_eq!(instance.name, "scenario_a");
    assert_eq!(instance.request.sites, scenario_a_sites());

    let outcome = strict_engine()
        .allocate(&instance.request)
        .expect("allocation failed");
    let plan = outcome.plan().expect("expected a solved plan");
    assert_eq!(plan.total_moves, 2);
    assert_eq!(plan.exams_moved, 7);
}

#[test]
fn test_dzn_fixture_ceiling_gap_by_mode() {
    let instance =
        parse_dzn_file(fixture_path("ceiling_gap.dzn")).expect("failed to parse fixture");

    assert!(matches!(
        strict_engine().allocate(&instance.request),
        Err(AllocationError::Infeasible { .. })
    ));

    let outcome = relaxed_engine()
        .allocate(&instance.request)
        .expect("allocation failed");
    assert_eq!(outcome.plan().map(|p| p.total_moves), Some(1));
}
