// ==========================================
// 阅卷点试卷调配系统 - 目标比例与站点分类
// ==========================================
// 职责: 计算目标比例 mean = ceil(总试卷 / 总评卷人)，划分调出点/调入点
// 规则:
// - 调出点: exam_count > mean * evaluator_count（盈余）
// - 调入点: mean * evaluator_count > exam_count（缺口）
// - 恰好平衡的站点不参与任何调配
// ==========================================

use crate::domain::allocation::SiteBalance;
use crate::domain::site::AllocationRequest;
use crate::domain::types::{SiteId, SiteRole};
use serde::{Deserialize, Serialize};

/// 目标比例（向上取整）
///
/// # 返回
/// - Some(mean): 评卷人总数 > 0
/// - None: 评卷人总数为 0，比例无定义
pub fn target_ratio(request: &AllocationRequest) -> Option<i64> {
    let total_exams = request.total_exams();
    let total_evaluators = request.total_evaluators();
    if total_evaluators <= 0 {
        return None;
    }
    // 计数已校验为非负；不用 (a + b - 1) / b，避免加法溢出
    Some(total_exams / total_evaluators + i64::from(total_exams % total_evaluators != 0))
}

// ==========================================
// Classification - 分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub mean: i64,
    pub donors: Vec<SiteBalance>,
    pub receivers: Vec<SiteBalance>,
    pub balanced: Vec<SiteId>,
}

impl Classification {
    /// 调出点盈余合计
    pub fn surplus_total(&self) -> i64 {
        self.donors
            .iter()
            .fold(0i64, |acc, d| acc.saturating_add(d.imbalance))
    }

    /// 调入点缺口合计
    pub fn deficit_total(&self) -> i64 {
        self.receivers
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.imbalance))
    }

    /// 平衡不变量: 盈余合计 == 缺口合计
    pub fn is_balanced(&self) -> bool {
        self.surplus_total() == self.deficit_total()
    }

    /// 单站点最大不平衡量（big-M 推导用）
    pub fn max_imbalance(&self) -> i64 {
        self.donors
            .iter()
            .chain(self.receivers.iter())
            .map(|s| s.imbalance)
            .max()
            .unwrap_or(0)
    }

    /// 是否存在可交换的调出/调入对
    pub fn has_exchanges(&self) -> bool {
        !self.donors.is_empty() && !self.receivers.is_empty()
    }
}

/// 按目标比例对站点分类（结果按 site_id 升序）
pub fn classify(request: &AllocationRequest, mean: i64) -> Classification {
    let mut sites = request.sites.clone();
    sites.sort_by_key(|s| s.site_id);

    let mut donors = Vec::new();
    let mut receivers = Vec::new();
    let mut balanced = Vec::new();

    for site in sites {
        let capacity = site.capacity_at(mean);
        if site.exam_count > capacity {
            donors.push(SiteBalance {
                site_id: site.site_id,
                role: SiteRole::Donor,
                imbalance: site.exam_count - capacity,
            });
        } else if capacity > site.exam_count {
            receivers.push(SiteBalance {
                site_id: site.site_id,
                role: SiteRole::Receiver,
                imbalance: capacity - site.exam_count,
            });
        } else {
            balanced.push(site.site_id);
        }
    }

    Classification {
        mean,
        donors,
        receivers,
        balanced,
    }
}
