// ==========================================
// 阅卷点试卷调配系统 - 核心库
// ==========================================
// 目标: 在阅卷点之间调配试卷，使人均阅卷量均衡，且调配线路最少
// 技术栈: Rust + SQLite + MILP (good_lp / microlp)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 标识、记录与结果
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 调配计算
pub mod engine;

// 服务层 - 缓存与调配编排
pub mod service;

// 导入层 - 外部数据
pub mod importer;

// 导出层 - 调配报表
pub mod export;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 性能统计
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    AllocationKey, AllocationOutcome, AllocationPlan, AllocationRequest, AllocationResult,
    BalanceMode, EvaluatorRecord, ExamRecord, Move, Site, SiteId, SubjectId,
};

pub use engine::{AllocationEngine, AllocationError};

pub use service::{AllocationCache, AllocationService, InMemoryAllocationCache};

pub use api::{AllocationApi, ApiError, ImportApi};

pub use config::AllocationConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "阅卷点试卷调配系统";
