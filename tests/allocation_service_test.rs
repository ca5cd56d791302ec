// ==========================================
// 调配服务集成测试
// ==========================================
// 覆盖: 缓存命中、写入失效、同键并发只计算一次、
//       批量查询、求解超时、错误不入缓存、键级锁回收
// ==========================================


use exam_balancer::engine::{
    AllocationEngine, ExchangeModel, ExchangeSolution, ExchangeSolver, MicroLpSolver, SolverError,
};
use exam_balancer::service::{
    AllocationCache, AllocationService, CacheInvalidator, DataChangeEvent, DataChangeListener,
    InMemoryAllocationCache, InMemoryDataSource, ServiceError,
};
use exam_balancer::{AllocationConfig, AllocationError, AllocationKey, Site, SubjectId};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{records_for, scenario_a_sites, test_date};

/// 每次求解前休眠，用于放大并发窗口
struct SlowSolver {
    delay: Duration,
}

impl ExchangeSolver for SlowSolver {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn solve(&self, model: &ExchangeModel) -> Result<ExchangeSolution, SolverError> {
        std::thread::sleep(self.delay);
        MicroLpSolver::new().solve(model)
    }
}

struct Fixture {
    service: AllocationService,
    source: Arc<InMemoryDataSource>,
    cache: Arc<dyn AllocationCache>,
}

fn fixture_with(engine: AllocationEngine, subject: SubjectId, sites: &[Site]) -> Fixture {
    exam_balancer::logging::init_test();
    let (exams, evaluators) = records_for(subject, test_date(8), sites);
    let source = Arc::new(InMemoryDataSource::new(exams, evaluators));
    let cache: Arc<dyn AllocationCache> = Arc::new(InMemoryAllocationCache::new());
    let service = AllocationService::new(engine, source.clone(), cache.clone());
    Fixture {
        service,
        source,
        cache,
    }
}

fn fixture(subject: SubjectId, sites: &[Site]) -> Fixture {
    fixture_with(
        AllocationEngine::new(AllocationConfig::default()),
        subject,
        sites,
    )
}

#[tokio::test]
async fn test_second_request_hits_cache() {
    let subject = SubjectId(101);
    let f = fixture(subject, &scenario_a_sites());
    let key = AllocationKey::new(subject, test_date(8));

    let first = f.service.get_allocation(key).await.expect("first request failed");
    let second = f.service.get_allocation(key).await.expect("second request failed");

    assert_eq!(f.service.computation_count(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.plan().map(|p| p.total_moves), Some(2));
    assert_eq!(f.cache.len(), 1);
}

#[tokio::test]
async fn test_data_change_invalidates_and_recomputes() {
    let subject = SubjectId(102);
    let f = fixture(subject, &scenario_a_sites());
    let invalidator = CacheInvalidator::new(f.cache.clone());
    let day_key = AllocationKey::new(subject, test_date(8));
    let subject_key = AllocationKey::subject_only(subject);

    f.service.get_allocation(day_key).await.expect("request failed");
    f.service.get_allocation(subject_key).await.expect("request failed");
    assert_eq!(f.service.computation_count(), 2);

    // 站点 2 补齐到 10 份：全部平衡，不再需要调配
    let balanced = vec![
        Site::new(1, 10, 1),
        Site::new(2, 10, 1),
        Site::new(3, 0, 0),
        Site::new(4, 10, 1),
    ];
    let (exams, _) = records_for(subject, test_date(8), &balanced);
    f.source.replace_exams(exams);
    invalidator
        .on_data_changed(&DataChangeEvent::exam_changed(subject, test_date(8), None))
        .expect("listener failed");

    // 单日变更同时失效该日键与科目汇总键
    assert!(f.cache.get(&day_key).is_none());
    assert!(f.cache.get(&subject_key).is_none());

    let outcome = f.service.get_allocation(day_key).await.expect("request failed");
    assert_eq!(f.service.computation_count(), 3);
    let plan = outcome.plan().expect("expected a solved plan");
    assert_eq!(plan.mean, 10);
    assert_eq!(plan.total_moves, 0);
}

#[tokio::test]
async fn test_evaluator_change_invalidates_whole_subject() {
    let subject = SubjectId(103);
    let other = SubjectId(104);
    let mut sites = scenario_a_sites();
    let f = fixture(subject, &sites);
    let invalidator = CacheInvalidator::new(f.cache.clone());

    f.service
        .get_allocation(AllocationKey::new(subject, test_date(8)))
        .await
        .expect("request failed");
    f.service
        .get_allocation(AllocationKey::new(other, test_date(8)))
        .await
        .expect("request failed");
    assert_eq!(f.cache.len(), 2);

    sites[2] = Site::new(3, 2, 1);
    let (_, evaluators) = records_for(subject, test_date(8), &sites);
    f.source.replace_evaluators(evaluators);
    invalidator
        .on_data_changed(&DataChangeEvent::evaluator_changed(subject, None))
        .expect("listener failed");

    assert!(f.cache.get(&AllocationKey::new(subject, test_date(8))).is_none());
    assert!(f.cache.get(&AllocationKey::new(other, test_date(8))).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_computes_once() {
    let subject = SubjectId(105);
    let engine = AllocationEngine::with_solver(
        Arc::new(SlowSolver {
            delay: Duration::from_millis(150),
        }),
        AllocationConfig::default(),
    );
    let f = fixture_with(engine, subject, &scenario_a_sites());
    let key = AllocationKey::new(subject, test_date(8));

    let results = join_all((0..8).map(|_| f.service.get_allocation(key))).await;

    assert_eq!(f.service.computation_count(), 1);
    let outcomes: Vec<_> = results
        .into_iter()
        .map(|r| r.expect("request failed"))
        .collect();
    assert!(outcomes.iter().all(|o| Arc::ptr_eq(o, &outcomes[0])));
    // 所有等待者退出后锁表清空
    assert_eq!(f.service.active_key_locks(), 0);
}

#[tokio::test]
async fn test_get_many_isolates_keys() {
    let subject = SubjectId(106);
    let f = fixture(subject, &scenario_a_sites());
    let keys = vec![
        AllocationKey::new(subject, test_date(8)),
        AllocationKey::subject_only(subject),
        // 没有任何记录的日期：评卷人仍在，但试卷为 0
        AllocationKey::new(subject, test_date(9)),
        // 未知科目：无评卷人 → 无数据
        AllocationKey::new(SubjectId(999), test_date(8)),
    ];

    let results = f.service.get_many(&keys).await;
    assert_eq!(results.len(), 4);
    assert_eq!(f.service.computation_count(), 4);

    let (key, first) = &results[0];
    assert_eq!(*key, keys[0]);
    assert_eq!(
        first.as_ref().expect("request failed").plan().map(|p| p.total_moves),
        Some(2)
    );

    let (_, empty_day) = &results[2];
    let plan = empty_day.as_ref().expect("request failed");
    assert_eq!(plan.plan().map(|p| p.mean), Some(0));
    assert_eq!(plan.plan().map(|p| p.total_moves), Some(0));

    let (_, unknown) = &results[3];
    assert!(unknown.as_ref().expect("request failed").is_no_data());
}

#[tokio::test]
async fn test_solve_timeout_is_reported() {
    let subject = SubjectId(107);
    let engine = AllocationEngine::with_solver(
        Arc::new(SlowSolver {
            delay: Duration::from_millis(400),
        }),
        AllocationConfig::default().with_solve_timeout(Duration::from_millis(20)),
    );
    let f = fixture_with(engine, subject, &scenario_a_sites());

    let err = f
        .service
        .get_allocation(AllocationKey::new(subject, test_date(8)))
        .await
        .unwrap_err();

    match err.as_allocation() {
        Some(AllocationError::Solver(msg)) => assert!(msg.contains("超时")),
        other => panic!("expected solver timeout, got {:?}", other),
    }
    assert!(f.cache.is_empty());
    assert_eq!(f.service.active_key_locks(), 0);
}

#[tokio::test]
async fn test_infeasible_result_not_cached() {
    let subject = SubjectId(108);
    let f = fixture(
        subject,
        &[Site::new(1, 7, 1), Site::new(2, 4, 1), Site::new(3, 0, 1)],
    );
    let key = AllocationKey::new(subject, test_date(8));

    let err = f.service.get_allocation(key).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Allocation(AllocationError::Infeasible {
            surplus_total: 3,
            deficit_total: 4
        })
    ));
    assert!(f.cache.is_empty());

    // 失败不缓存：再次请求会重新计算
    let _ = f.service.get_allocation(key).await;
    assert_eq!(f.service.computation_count(), 2);
}

#[tokio::test]
async fn test_key_locks_do_not_accumulate() {
    let subject = SubjectId(109);
    let f = fixture(subject, &scenario_a_sites());
    let keys: Vec<AllocationKey> = (1..=20)
        .map(|day| AllocationKey::new(subject, test_date(day)))
        .collect();

    for key in &keys {
        f.service.get_allocation(*key).await.expect("request failed");
        assert_eq!(f.service.active_key_locks(), 0);
    }
    let results = f.service.get_many(&keys).await;

    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(f.service.computation_count(), 20);
    assert_eq!(f.service.active_key_locks(), 0);
}
