// ==========================================
// 阅卷点试卷调配系统 - API层错误类型
// ==========================================
// 职责: 将仓储/引擎/导入错误转换为用户友好的错误消息
// ==========================================

use crate::engine::error::AllocationError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use crate::service::error::ServiceError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调配错误
    // ==========================================
    #[error("调配不可行: {0}")]
    Infeasible(String),

    #[error("求解失败: {0}")]
    SolverFailure(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入导出错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("文件导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为调用方输入问题（可修正数据后重试）
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidInput(_)
                | ApiError::NotFound(_)
                | ApiError::ValidationError(_)
                | ApiError::ImportError(_)
                | ApiError::Infeasible(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseBusy(msg) => {
                ApiError::DatabaseTransactionError(format!("数据库忙: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::MissingMasterData(msg) => ApiError::BusinessRuleViolation(format!(
                "记录引用的阅卷点或科目不存在: {}",
                msg
            )),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            err @ RepositoryError::NegativeCount { .. } => ApiError::InvalidInput(err.to_string()),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Infeasible { .. } => ApiError::Infeasible(err.to_string()),
            AllocationError::Solver(msg) => ApiError::SolverFailure(msg),
            other => ApiError::ValidationError(other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Repository(e) => e.into(),
            ServiceError::Allocation(e) => e.into(),
            ServiceError::TaskJoin(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{SiteId, SubjectId};

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NegativeCount {
            field: "evaluator_count",
            site_id: SiteId(4),
            subject_id: SubjectId(42),
            value: -1,
        };
        match ApiError::from(repo_err) {
            ApiError::InvalidInput(msg) => {
                assert!(msg.contains("evaluator_count"));
                assert!(msg.contains("42"));
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }

        let err = ApiError::from(RepositoryError::MissingMasterData("FOREIGN KEY".into()));
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_allocation_error_conversion() {
        let err: ApiError = AllocationError::Infeasible {
            surplus_total: 3,
            deficit_total: 4,
        }
        .into();
        assert!(matches!(err, ApiError::Infeasible(ref msg) if msg.contains("3")));
        assert!(err.is_user_error());

        let err: ApiError = AllocationError::DuplicateSite(7).into();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err: ApiError = ServiceError::Allocation(AllocationError::Solver("x".into())).into();
        assert!(matches!(err, ApiError::SolverFailure(_)));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_import_error_conversion() {
        let err: ApiError = ImportError::MissingField {
            row: 3,
            field: "FECHA".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::ImportError(ref msg) if msg.contains("FECHA")));
    }
}
