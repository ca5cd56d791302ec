// ==========================================
// 阅卷点试卷调配系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束分类依据 SQLite 扩展错误码，不解析错误文本
// ==========================================

use crate::domain::types::{SiteId, SubjectId};
use rusqlite::ffi;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 连接 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库忙: {0}")]
    DatabaseBusy(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 约束 =====
    /// 考试/评卷人记录引用了不存在的阅卷点或科目
    #[error("引用的阅卷点或科目不存在: {0}")]
    MissingMasterData(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    // ===== 数据质量 =====
    #[error("{field} 为负 (site_id={site_id}, subject_id={subject_id}): {value}")]
    NegativeCount {
        field: &'static str,
        site_id: SiteId,
        subject_id: SubjectId,
        value: i64,
    },
}

impl RepositoryError {
    /// 是否为数据本身的问题（修正数据后可重试）
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::MissingMasterData(_)
                | RepositoryError::UniqueConstraintViolation(_)
                | RepositoryError::NegativeCount { .. }
        )
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg) => {
                let msg = msg.unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepositoryError::MissingMasterData(msg),
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(msg)
                    }
                    _ if matches!(
                        code.code,
                        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                    ) =>
                    {
                        RepositoryError::DatabaseBusy(msg)
                    }
                    _ => RepositoryError::DatabaseQueryError(msg),
                }
            }
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
