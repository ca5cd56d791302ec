// ==========================================
// 阅卷点试卷调配系统 - 阅卷点与原始记录
// ==========================================
// 职责: 定义阅卷点聚合数据、考试记录、评卷人记录
// 红线: 不含数据访问逻辑
// ==========================================

use crate::domain::types::{SiteId, SubjectId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// Site - 阅卷点聚合数据
// ==========================================
// 单个科目（及日期）下的试卷总数与评卷人总数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: SiteId,
    pub exam_count: i64,      // 试卷数
    pub evaluator_count: i64, // 评卷人数
}

impl Site {
    pub fn new(site_id: impl Into<SiteId>, exam_count: i64, evaluator_count: i64) -> Self {
        Self {
            site_id: site_id.into(),
            exam_count,
            evaluator_count,
        }
    }

    /// 在目标比例下本站点可承担的试卷数
    pub fn capacity_at(&self, mean: i64) -> i64 {
        mean.saturating_mul(self.evaluator_count)
    }
}

// ==========================================
// AllocationRequest - 单次调配请求
// ==========================================
// 不变量: 同一请求内 site_id 唯一（由引擎在建模前校验）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub sites: Vec<Site>,
}

impl AllocationRequest {
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// 试卷总数（溢出时饱和；精确值由引擎校验保证）
    pub fn total_exams(&self) -> i64 {
        self.sites
            .iter()
            .fold(0i64, |acc, s| acc.saturating_add(s.exam_count))
    }

    pub fn total_evaluators(&self) -> i64 {
        self.sites
            .iter()
            .fold(0i64, |acc, s| acc.saturating_add(s.evaluator_count))
    }
}

impl FromIterator<Site> for AllocationRequest {
    fn from_iter<T: IntoIterator<Item = Site>>(iter: T) -> Self {
        Self {
            sites: iter.into_iter().collect(),
        }
    }
}

// ==========================================
// ExamRecord - 考试记录
// ==========================================
// 唯一约束: (site_id, subject_id, exam_date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRecord {
    pub site_id: SiteId,
    pub subject_id: SubjectId,
    pub exam_date: NaiveDate,
    pub exam_count: i64,
}

// ==========================================
// EvaluatorRecord - 评卷人记录
// ==========================================
// 唯一约束: (site_id, subject_id)，与考试日期无关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorRecord {
    pub site_id: SiteId,
    pub subject_id: SubjectId,
    pub evaluator_count: i64,
}

// ==========================================
// 主数据
// ==========================================

/// 阅卷点主数据（展示名称）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub site_id: SiteId,
    pub location: String,
}

/// 科目主数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub subject_id: SubjectId,
    pub name: String,
}
