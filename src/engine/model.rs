// ==========================================
// 阅卷点试卷调配系统 - 调配优化模型
// ==========================================
// 职责: 由分类结果构建与求解器无关的整数规划模型
// 变量（每个 调出点 d × 调入点 r）:
// - moves[d][r]  整数 ∈ [0, min(盈余[d], 缺口[r])]
// - linked[d][r] 0/1，moves > 0 时必须为 1
// 约束:
// - linked ≤ moves,  moves ≤ M · linked
// - Σ_r moves[d][r] (=|≤) 盈余[d]
// - Σ_d moves[d][r] (=|≤) 缺口[r]
// 目标: min Σ linked[d][r]
// ==========================================

use crate::domain::allocation::SiteBalance;
use crate::domain::types::{BalanceMode, SiteId};
use crate::engine::classifier::Classification;
use crate::engine::error::{AllocationError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 平衡约束的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceSense {
    /// 合计必须等于不平衡量
    Equal,
    /// 合计不超过不平衡量
    AtMost,
}

/// 调出点 × 调入点 变量对
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePair {
    pub donor_index: usize,
    pub receiver_index: usize,
    /// moves 变量上界 max(0, min(盈余, 缺口))
    pub upper: i64,
}

// ==========================================
// ExchangeModel - 求解器输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeModel {
    pub donors: Vec<SiteBalance>,
    pub receivers: Vec<SiteBalance>,
    pub pairs: Vec<ExchangePair>,
    pub big_m: i64,
    pub donor_sense: BalanceSense,
    pub receiver_sense: BalanceSense,
}

impl ExchangeModel {
    pub fn donor_id(&self, pair: &ExchangePair) -> SiteId {
        self.donors[pair.donor_index].site_id
    }

    pub fn receiver_id(&self, pair: &ExchangePair) -> SiteId {
        self.receivers[pair.receiver_index].site_id
    }

    /// 某调出点的全部变量对下标
    pub fn pairs_of_donor(&self, donor_index: usize) -> impl Iterator<Item = usize> + '_ {
        self.pairs
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.donor_index == donor_index)
            .map(|(i, _)| i)
    }

    /// 某调入点的全部变量对下标
    pub fn pairs_of_receiver(&self, receiver_index: usize) -> impl Iterator<Item = usize> + '_ {
        self.pairs
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.receiver_index == receiver_index)
            .map(|(i, _)| i)
    }
}

// ==========================================
// ExchangeSolution - 求解器输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExchangeSolution {
    /// (调出点, 调入点) → 调动数量，仅保留 > 0 的项
    pub moves: BTreeMap<(SiteId, SiteId), i64>,
    /// 目标函数值（活跃链路数）
    pub objective: usize,
}

/// 推导 big-M
///
/// 取单站点最大不平衡量（至少为 1）；配置下限只能抬高、不能压低
pub fn derive_big_m(classification: &Classification, floor: Option<i64>) -> i64 {
    let derived = classification.max_imbalance().max(1);
    match floor {
        Some(f) if f > derived => f,
        _ => derived,
    }
}

/// 构建调配模型
///
/// # 错误
/// - STRICT 模式下盈余合计 ≠ 缺口合计 → Infeasible
pub fn build_model(
    classification: &Classification,
    balance_mode: BalanceMode,
    big_m_floor: Option<i64>,
) -> EngineResult<ExchangeModel> {
    let surplus_total = classification.surplus_total();
    let deficit_total = classification.deficit_total();

    let (donor_sense, receiver_sense) = match balance_mode {
        BalanceMode::Strict => {
            if surplus_total != deficit_total {
                return Err(AllocationError::Infeasible {
                    surplus_total,
                    deficit_total,
                });
            }
            (BalanceSense::Equal, BalanceSense::Equal)
        }
        BalanceMode::Relaxed => {
            if surplus_total < deficit_total {
                (BalanceSense::Equal, BalanceSense::AtMost)
            } else if surplus_total > deficit_total {
                (BalanceSense::AtMost, BalanceSense::Equal)
            } else {
                (BalanceSense::Equal, BalanceSense::Equal)
            }
        }
    };

    let mut pairs = Vec::with_capacity(classification.donors.len() * classification.receivers.len());
    for (donor_index, donor) in classification.donors.iter().enumerate() {
        for (receiver_index, receiver) in classification.receivers.iter().enumerate() {
            pairs.push(ExchangePair {
                donor_index,
                receiver_index,
                upper: donor.imbalance.min(receiver.imbalance).max(0),
            });
        }
    }

    Ok(ExchangeModel {
        donors: classification.donors.clone(),
        receivers: classification.receivers.clone(),
        pairs,
        big_m: derive_big_m(classification, big_m_floor),
        donor_sense,
        receiver_sense,
    })
}
