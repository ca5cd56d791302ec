// ==========================================
// 阅卷点试卷调配系统 - 领域模型层
// ==========================================
// 职责: 定义标识类型、原始记录、调配请求与调配结果
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod site;
pub mod types;

// 重导出核心类型
pub use allocation::{AllocationOutcome, AllocationPlan, AllocationResult, Move, SiteBalance};
pub use site::{AllocationRequest, EvaluatorRecord, ExamRecord, Site, SiteInfo, SubjectInfo};
pub use types::{AllocationKey, BalanceMode, SiteId, SiteRole, SubjectId};
