// ==========================================
// 阅卷点试卷调配系统 - 领域类型定义
// ==========================================
// 职责: 强类型标识符、缓存键、站点角色、平衡模式
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 阅卷点标识 (Site / Headquarter)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub i64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SiteId {
    fn from(value: i64) -> Self {
        SiteId(value)
    }
}

// ==========================================
// 科目标识 (Subject)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubjectId {
    fn from(value: i64) -> Self {
        SubjectId(value)
    }
}

// ==========================================
// 调配计算键 (subject, date)
// ==========================================
// date = None 表示按科目汇总全部考试日期
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationKey {
    pub subject_id: SubjectId,
    pub date: Option<NaiveDate>,
}

impl AllocationKey {
    /// 指定科目 + 日期
    pub fn new(subject_id: SubjectId, date: NaiveDate) -> Self {
        Self {
            subject_id,
            date: Some(date),
        }
    }

    /// 仅按科目（汇总所有日期）
    pub fn subject_only(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            date: None,
        }
    }

    /// 判断某条考试记录的日期是否落在此键范围内
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        match self.date {
            Some(d) => d == date,
            None => true,
        }
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(d) => write!(f, "subject={} date={}", self.subject_id, d),
            None => write!(f, "subject={} date=*", self.subject_id),
        }
    }
}

// ==========================================
// 站点角色 (Site Role)
// ==========================================
// DONOR: 试卷多于评卷能力，需要调出
// RECEIVER: 试卷少于评卷能力，需要调入
// BALANCED: 恰好平衡，不参与任何调配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteRole {
    Donor,
    Receiver,
    Balanced,
}

impl fmt::Display for SiteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteRole::Donor => write!(f, "DONOR"),
            SiteRole::Receiver => write!(f, "RECEIVER"),
            SiteRole::Balanced => write!(f, "BALANCED"),
        }
    }
}

// ==========================================
// 平衡模式 (Balance Mode)
// ==========================================
// STRICT: 调出总量与调入总量必须完全相等，否则判定不可行
// RELAXED: 总量较小的一侧精确平衡，另一侧仅要求不超过
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceMode {
    #[default]
    Strict,
    Relaxed,
}

impl fmt::Display for BalanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceMode::Strict => write!(f, "STRICT"),
            BalanceMode::Relaxed => write!(f, "RELAXED"),
        }
    }
}

impl FromStr for BalanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STRICT" => Ok(BalanceMode::Strict),
            "RELAXED" => Ok(BalanceMode::Relaxed),
            other => Err(format!("未知的平衡模式: {}", other)),
        }
    }
}
