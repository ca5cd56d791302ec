// ==========================================
// 数据导入端到端测试
// ==========================================
// 流程: CSV 导入 → 调配查询 → 报表导出
// ==========================================


use exam_balancer::api::ApiError;
use exam_balancer::{AllocationKey, SiteId, SubjectId};
use std::fs;
use std::path::{Path, PathBuf};
use test_helpers::{create_test_state, test_date};

const EXAMS_CSV: &str = "\
COD_SEDE,UBICACION,COD_ASIGNATURA,ASIGNATURA,FECHA,EXAMENES
1,Campus Norte,15,Matematicas,08/06/23,10
2,Campus Sur,15,Matematicas,08/06/23,3
3,Campus Este,15,Matematicas,08/06/23,2
4,Campus Oeste,15,Matematicas,08/06/23,15
";

const EVALUATORS_CSV: &str = "\
COD_SEDE,COD_ASIGNATURA,EVALUADORES
1,15,1
2,15,1
3,15,0
4,15,1
";

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

#[tokio::test]
async fn test_import_then_allocate() {
    let (_temp_file, state) = create_test_state().expect("Failed to create test state");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let exams = write_file(dir.path(), "exams.csv", EXAMS_CSV);
    let evaluators = write_file(dir.path(), "evaluators.csv", EVALUATORS_CSV);

    let response = state
        .import_api
        .import_exams(&exams)
        .await
        .expect("exam import failed");
    assert_eq!(response.imported, 4);
    assert_eq!(response.sites, 4);
    assert_eq!(response.subjects, vec![SubjectId(15)]);
    assert!(!response.batch_id.is_empty());

    let response = state
        .import_api
        .import_evaluators(&evaluators)
        .await
        .expect("evaluator import failed");
    assert_eq!(response.imported, 4);

    // 主数据名称来自表中可选列
    let site = state
        .site_repo
        .find_by_id(SiteId(2))
        .expect("query failed")
        .expect("site missing");
    assert_eq!(site.location, "Campus Sur");
    let subject = state
        .subject_repo
        .find_by_id(SubjectId(15))
        .expect("query failed")
        .expect("subject missing");
    assert_eq!(subject.name, "Matematicas");

    let result = state
        .allocation_api
        .get_moves(SubjectId(15), Some(test_date(8)))
        .await
        .expect("allocation failed");
    assert_eq!(result.mean, Some(10));
    assert_eq!(result.total_moves, Some(2));
    let moves = result.move_details.expect("missing move details");
    assert_eq!(moves.len(), 2);
    assert!(moves.iter().all(|m| m.to_site == SiteId(2)));
}

#[tokio::test]
async fn test_reimport_invalidates_cache() {
    let (_temp_file, state) = create_test_state().expect("Failed to create test state");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let exams = write_file(dir.path(), "exams.csv", EXAMS_CSV);
    let evaluators = write_file(dir.path(), "evaluators.csv", EVALUATORS_CSV);
    state.import_api.import_exams(&exams).await.expect("import failed");
    state
        .import_api
        .import_evaluators(&evaluators)
        .await
        .expect("import failed");

    let key = AllocationKey::new(SubjectId(15), test_date(8));
    state
        .allocation_api
        .get_moves(SubjectId(15), Some(test_date(8)))
        .await
        .expect("allocation failed");
    assert!(state.cache.get(&key).is_some());

    // 重新导入后各站点恰好平衡：覆盖同键记录并失效缓存
    let balanced = "\
COD_SEDE,COD_ASIGNATURA,FECHA,EXAMENES
1,15,08/06/23,10
2,15,08/06/23,10
3,15,08/06/23,0
4,15,08/06/23,10
";
    let exams = write_file(dir.path(), "exams_v2.csv", balanced);
    state.import_api.import_exams(&exams).await.expect("import failed");
    assert!(state.cache.get(&key).is_none());

    let result = state
        .allocation_api
        .get_moves(SubjectId(15), Some(test_date(8)))
        .await
        .expect("allocation failed");
    assert_eq!(result.total_moves, Some(0));
    assert_eq!(result.move_details, Some(vec![]));
}

#[tokio::test]
async fn test_bad_row_rejects_whole_sheet() {
    let (_temp_file, state) = create_test_state().expect("Failed to create test state");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let bad = "\
COD_SEDE,COD_ASIGNATURA,FECHA,EXAMENES
1,15,08/06/23,10
2,15,not-a-date,3
";
    let path = write_file(dir.path(), "bad.csv", bad);

    let err = state.import_api.import_exams(&path).await.unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)));
    assert!(err.is_user_error());

    let stored = state
        .exam_repo
        .find_by_key(&AllocationKey::subject_only(SubjectId(15)))
        .expect("query failed");
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_unsupported_extension_rejected() {
    let (_temp_file, state) = create_test_state().expect("Failed to create test state");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_file(dir.path(), "exams.txt", EXAMS_CSV);

    let err = state.import_api.import_exams(&path).await.unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)));
}

#[tokio::test]
async fn test_export_uses_site_names() {
    let (_temp_file, state) = create_test_state().expect("Failed to create test state");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let exams = write_file(dir.path(), "exams.csv", EXAMS_CSV);
    let evaluators = write_file(dir.path(), "evaluators.csv", EVALUATORS_CSV);
    state.import_api.import_exams(&exams).await.expect("import failed");
    state
        .import_api
        .import_evaluators(&evaluators)
        .await
        .expect("import failed");

    let out = dir.path().join("moves.csv");
    let response = state
        .allocation_api
        .export_moves(SubjectId(15), Some(test_date(8)), &out)
        .await
        .expect("export failed");
    assert_eq!(response.rows, 2);

    let content = fs::read_to_string(&out).expect("Failed to read export");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "Campus Este,Campus Sur,2");
    assert_eq!(lines[2], "Campus Oeste,Campus Sur,5");
}

#[tokio::test]
async fn test_moves_by_date_covers_each_day() {
    let (_temp_file, state) = create_test_state().expect("Failed to create test state");
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let two_days = "\
COD_SEDE,COD_ASIGNATURA,FECHA,EXAMENES
1,15,08/06/23,10
2,15,08/06/23,3
3,15,08/06/23,2
4,15,08/06/23,15
1,15,2023-06-09,5
2,15,2023-06-09,4
";
    let exams = write_file(dir.path(), "exams.csv", two_days);
    let evaluators = write_file(dir.path(), "evaluators.csv", EVALUATORS_CSV);
    state.import_api.import_exams(&exams).await.expect("import failed");
    state
        .import_api
        .import_evaluators(&evaluators)
        .await
        .expect("import failed");

    let by_date = state
        .allocation_api
        .get_moves_by_date(SubjectId(15))
        .await
        .expect("allocation failed");
    assert_eq!(by_date.len(), 2);
    assert_eq!(by_date[0].date, test_date(8));
    assert_eq!(by_date[0].result.total_moves, Some(2));

    // 6/9: 9 份 / 3 人 → 目标 3；站点 1 超 2、站点 2 超 1，站点 4 缺 3
    assert_eq!(by_date[1].date, test_date(9));
    assert_eq!(by_date[1].result.mean, Some(3));
    assert_eq!(by_date[1].result.total_moves, Some(2));
}
