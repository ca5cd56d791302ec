// ==========================================
// 阅卷点试卷调配系统 - 应用状态
// ==========================================
// 职责: 组装共享连接、仓储、缓存、调配服务与 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AllocationApi, ImportApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::AllocationEngine;
use crate::repository::{
    EvaluatorRepository, ExamRepository, SiteRepository, SubjectRepository,
};
use crate::service::{
    AllocationCache, AllocationService, CacheInvalidator, InMemoryAllocationCache,
    OptionalListener, RepositoryDataSource,
};

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "EXAM_BALANCER_DB_PATH";

/// 应用状态
///
/// 所有仓储共享同一个连接；写入经 CacheInvalidator 失效调配缓存
pub struct AppState {
    pub db_path: String,

    pub allocation_api: Arc<AllocationApi>,
    pub import_api: Arc<ImportApi>,
    pub config_manager: Arc<ConfigManager>,

    pub exam_repo: Arc<ExamRepository>,
    pub evaluator_repo: Arc<EvaluatorRepository>,
    pub site_repo: Arc<SiteRepository>,
    pub subject_repo: Arc<SubjectRepository>,

    pub cache: Arc<dyn AllocationCache>,
}

impl AppState {
    /// 打开（或新建）数据库并组装全部组件
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::perf::install_sqlite_tracing(&mut conn);
        Self::from_connection(db_path, conn)
    }

    /// 从已打开的连接组装（测试使用内存库）
    pub fn from_connection(db_path: String, conn: Connection) -> Result<Self, String> {
        init_schema(&conn).map_err(|e| format!("schema 初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let allocation_config = config_manager
            .load_allocation_config()
            .map_err(|e| format!("读取调配配置失败: {}", e))?;
        tracing::info!(
            balance_mode = %allocation_config.balance_mode,
            big_m_floor = ?allocation_config.big_m_floor,
            solve_timeout_ms = ?allocation_config.solve_timeout_ms,
            "调配配置已加载"
        );

        // ==========================================
        // 缓存 + 仓储（写入即失效）
        // ==========================================
        let cache: Arc<dyn AllocationCache> = Arc::new(InMemoryAllocationCache::new());
        let listener =
            OptionalListener::with_listener(Arc::new(CacheInvalidator::new(cache.clone())));

        let site_repo = Arc::new(
            SiteRepository::from_connection(conn.clone()).with_listener(listener.clone()),
        );
        let subject_repo = Arc::new(SubjectRepository::from_connection(conn.clone()));
        let exam_repo = Arc::new(
            ExamRepository::from_connection(conn.clone()).with_listener(listener.clone()),
        );
        let evaluator_repo = Arc::new(
            EvaluatorRepository::from_connection(conn.clone()).with_listener(listener),
        );

        // ==========================================
        // 服务 + API
        // ==========================================
        let engine = AllocationEngine::new(allocation_config);
        let source = Arc::new(RepositoryDataSource::new(
            exam_repo.clone(),
            evaluator_repo.clone(),
        ));
        let service = Arc::new(AllocationService::new(engine, source, cache.clone()));

        let allocation_api = Arc::new(AllocationApi::new(
            service,
            site_repo.clone(),
            exam_repo.clone(),
        ));
        let import_api = Arc::new(ImportApi::new(
            site_repo.clone(),
            subject_repo.clone(),
            exam_repo.clone(),
            evaluator_repo.clone(),
        ));

        tracing::info!("AppState初始化成功");
        Ok(Self {
            db_path,
            allocation_api,
            import_api,
            config_manager,
            exam_repo,
            evaluator_repo,
            site_repo,
            subject_repo,
            cache,
        })
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 EXAM_BALANCER_DB_PATH（非空时）
/// - 否则: 用户数据目录/exam-balancer/exam_balancer.db
/// - 无法获取数据目录时: ./exam_balancer.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./exam_balancer.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("exam-balancer");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("exam_balancer.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::site::{EvaluatorRecord, ExamRecord};
    use crate::domain::types::{AllocationKey, SiteId, SubjectId};
    use chrono::NaiveDate;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[tokio::test]
    async fn test_writes_invalidate_cached_allocation() {
        let state =
            AppState::from_connection(":memory:".into(), Connection::open_in_memory().unwrap())
                .unwrap();
        let subject = SubjectId(1);
        let date = NaiveDate::from_ymd_opt(2023, 6, 8).unwrap();
        state.subject_repo.ensure_exists(subject).unwrap();
        for site in 1..=2 {
            state.site_repo.ensure_exists(SiteId(site)).unwrap();
            state
                .evaluator_repo
                .upsert(&EvaluatorRecord {
                    site_id: SiteId(site),
                    subject_id: subject,
                    evaluator_count: 1,
                })
                .unwrap();
        }
        state
            .exam_repo
            .upsert(&ExamRecord {
                site_id: SiteId(1),
                subject_id: subject,
                exam_date: date,
                exam_count: 4,
            })
            .unwrap();

        let first = state.allocation_api.get_moves(subject, Some(date)).await.unwrap();
        assert_eq!(first.mean, Some(2));
        assert!(state.cache.get(&AllocationKey::new(subject, date)).is_some());

        state
            .exam_repo
            .upsert(&ExamRecord {
                site_id: SiteId(2),
                subject_id: subject,
                exam_date: date,
                exam_count: 4,
            })
            .unwrap();
        assert!(state.cache.get(&AllocationKey::new(subject, date)).is_none());

        let second = state.allocation_api.get_moves(subject, Some(date)).await.unwrap();
        assert_eq!(second.mean, Some(4));
        assert_eq!(second.total_moves, Some(0));
    }
}
