// ==========================================
// 阅卷点试卷调配系统 - 引擎层
// ==========================================
// 职责: 聚合 → 目标比例 → 分类 → MILP 建模 → 求解 → 结果提取
// 红线: Engine 不拼 SQL、不做缓存，纯计算
// ==========================================

pub mod aggregation;
pub mod allocator;
pub mod classifier;
pub mod error;
pub mod model;
pub mod solver;

// 重导出核心引擎
pub use aggregation::{aggregate_records, validate_request};
pub use allocator::AllocationEngine;
pub use classifier::{classify, target_ratio, Classification};
pub use error::{AllocationError, EngineResult};
pub use model::{build_model, BalanceSense, ExchangeModel, ExchangePair, ExchangeSolution};
pub use solver::{ExchangeSolver, MicroLpSolver, SolverError};
