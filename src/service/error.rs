// ==========================================
// 阅卷点试卷调配系统 - 调配服务错误类型
// ==========================================

use crate::engine::error::AllocationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("后台求解任务异常终止: {0}")]
    TaskJoin(String),
}

impl ServiceError {
    /// 引擎错误（如有）
    pub fn as_allocation(&self) -> Option<&AllocationError> {
        match self {
            ServiceError::Allocation(e) => Some(e),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type ServiceResult<T> = Result<T, ServiceError>;
