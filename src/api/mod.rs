// ==========================================
// 阅卷点试卷调配系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行与嵌入方调用
// ==========================================

pub mod allocation_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use allocation_api::{AllocationApi, DatedAllocation, ExportResponse};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse};
