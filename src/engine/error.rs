// ==========================================
// 阅卷点试卷调配系统 - 调配引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: “无数据”不是错误，由 AllocationOutcome::NoData 表达
// ==========================================

use thiserror::Error;

/// 调配引擎错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    // ===== 输入校验错误（建模前拒绝） =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("阅卷点重复: site_id={0}")]
    DuplicateSite(i64),

    #[error("计数为负 (site_id={site_id}, field={field}): {value}")]
    NegativeCount {
        site_id: i64,
        field: &'static str,
        value: i64,
    },

    // ===== 模型不可行 =====
    #[error("调配不可行: 调出总量={surplus_total}, 调入总量={deficit_total}")]
    Infeasible {
        surplus_total: i64,
        deficit_total: i64,
    },

    // ===== 求解器错误 =====
    #[error("求解器失败: {0}")]
    Solver(String),
}

impl AllocationError {
    /// 是否为输入校验类错误
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AllocationError::InvalidInput(_)
                | AllocationError::DuplicateSite(_)
                | AllocationError::NegativeCount { .. }
        )
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, AllocationError>;
