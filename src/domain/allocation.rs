// ==========================================
// 阅卷点试卷调配系统 - 调配结果模型
// ==========================================
// 职责: 调配方案、调配结果（带 NoData 哨兵）、展示用扁平结构
// ==========================================

use crate::domain::types::{SiteId, SiteRole};
use serde::{Deserialize, Serialize};

// ==========================================
// Move - 单条调配（调出点 → 调入点）
// ==========================================
// 仅当 count > 0 时存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    #[serde(rename = "from_HQ")]
    pub from_site: SiteId,
    #[serde(rename = "to_HQ")]
    pub to_site: SiteId,
    #[serde(rename = "num_moves")]
    pub count: i64,
}

// ==========================================
// SiteBalance - 分类后的站点不平衡量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteBalance {
    pub site_id: SiteId,
    pub role: SiteRole,
    /// 不平衡量的绝对值（调出点为盈余，调入点为缺口，平衡点为 0）
    pub imbalance: i64,
}

// ==========================================
// AllocationPlan - 求解后的调配方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// 目标比例 ceil(总试卷 / 总评卷人)
    pub mean: i64,
    /// 活跃调配链路数（目标函数值）
    pub total_moves: usize,
    /// 实际调动的试卷总量
    pub exams_moved: i64,
    /// 按 (from, to) 排序的调配明细
    pub moves: Vec<Move>,
    pub donors: Vec<SiteBalance>,
    pub receivers: Vec<SiteBalance>,
    /// 本次建模使用的 big-M
    pub big_m: i64,
}

impl AllocationPlan {
    /// 无需任何调配的方案
    pub fn empty(mean: i64, donors: Vec<SiteBalance>, receivers: Vec<SiteBalance>) -> Self {
        Self {
            mean,
            total_moves: 0,
            exams_moved: 0,
            moves: Vec::new(),
            donors,
            receivers,
            big_m: 0,
        }
    }

    /// 判断某站点是否出现在任一调配中
    pub fn involves(&self, site_id: SiteId) -> bool {
        self.moves
            .iter()
            .any(|m| m.from_site == site_id || m.to_site == site_id)
    }
}

// ==========================================
// AllocationOutcome - 引擎输出
// ==========================================
// NoData: 评卷人总数为 0，目标比例无定义（不是错误）
// 不可行、求解器失败走错误通道 (AllocationError)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationOutcome {
    NoData,
    Solved(AllocationPlan),
}

impl AllocationOutcome {
    pub fn is_no_data(&self) -> bool {
        matches!(self, AllocationOutcome::NoData)
    }

    pub fn plan(&self) -> Option<&AllocationPlan> {
        match self {
            AllocationOutcome::Solved(plan) => Some(plan),
            AllocationOutcome::NoData => None,
        }
    }

    /// 转换为展示层使用的扁平结构
    pub fn to_result(&self) -> AllocationResult {
        match self {
            AllocationOutcome::NoData => AllocationResult {
                mean: None,
                total_moves: None,
                move_details: None,
            },
            AllocationOutcome::Solved(plan) => AllocationResult {
                mean: Some(plan.mean),
                total_moves: Some(plan.total_moves),
                move_details: Some(plan.moves.clone()),
            },
        }
    }
}

// ==========================================
// AllocationResult - 展示层扁平结构
// ==========================================
// 三个字段同时为 null 表示“无数据”
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub mean: Option<i64>,
    pub total_moves: Option<usize>,
    pub move_details: Option<Vec<Move>>,
}
