// ==========================================
// 阅卷点试卷调配系统 - 数据变更事件
// ==========================================
// 职责: 定义数据变更事件与监听 trait，实现依赖倒置
// 说明: Repository 层只负责发布事件，缓存层实现监听并失效对应结果
// ==========================================

use crate::domain::types::SubjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 变更事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataChangeType {
    /// 考试记录新增/修改/删除
    ExamChanged,
    /// 评卷人记录新增/修改/删除
    EvaluatorChanged,
    /// 批量导入
    BulkImport,
    /// 手动失效
    ManualInvalidate,
}

impl DataChangeType {
    pub fn as_str(&self) -> &str {
        match self {
            DataChangeType::ExamChanged => "ExamChanged",
            DataChangeType::EvaluatorChanged => "EvaluatorChanged",
            DataChangeType::BulkImport => "BulkImport",
            DataChangeType::ManualInvalidate => "ManualInvalidate",
        }
    }
}

/// 数据变更事件
///
/// date 仅对考试记录有意义；评卷人记录与日期无关，变更影响整个科目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChangeEvent {
    pub event_type: DataChangeType,
    pub subject_id: SubjectId,
    pub date: Option<NaiveDate>,
    /// 事件来源描述
    pub source: Option<String>,
}

impl DataChangeEvent {
    /// 考试记录变更（定位到具体日期）
    pub fn exam_changed(subject_id: SubjectId, date: NaiveDate, source: Option<String>) -> Self {
        Self {
            event_type: DataChangeType::ExamChanged,
            subject_id,
            date: Some(date),
            source,
        }
    }

    /// 评卷人记录变更（影响科目下全部日期）
    pub fn evaluator_changed(subject_id: SubjectId, source: Option<String>) -> Self {
        Self {
            event_type: DataChangeType::EvaluatorChanged,
            subject_id,
            date: None,
            source,
        }
    }

    /// 批量导入（影响科目下全部日期）
    pub fn bulk_import(subject_id: SubjectId, source: Option<String>) -> Self {
        Self {
            event_type: DataChangeType::BulkImport,
            subject_id,
            date: None,
            source,
        }
    }

    /// 是否影响整个科目
    pub fn is_subject_wide(&self) -> bool {
        self.date.is_none()
    }
}

// ==========================================
// 变更监听 Trait
// ==========================================

/// 数据变更监听者
///
/// # 实现说明
/// - `CacheInvalidator` 实现此 trait，收到事件即失效对应缓存键
pub trait DataChangeListener: Send + Sync {
    fn on_data_changed(&self, event: &DataChangeEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作监听者（单元测试 / 无缓存场景）
#[derive(Debug, Clone, Default)]
pub struct NoOpListener;

impl DataChangeListener for NoOpListener {
    fn on_data_changed(&self, event: &DataChangeEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpListener: 忽略数据变更 - subject_id={}, event_type={}",
            event.subject_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选监听者包装
///
/// 简化 Option<Arc<dyn DataChangeListener>> 的使用；通知失败只记录日志，不影响写入
#[derive(Clone, Default)]
pub struct OptionalListener {
    inner: Option<Arc<dyn DataChangeListener>>,
}

impl OptionalListener {
    pub fn with_listener(listener: Arc<dyn DataChangeListener>) -> Self {
        Self {
            inner: Some(listener),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn notify(&self, event: DataChangeEvent) {
        let Some(listener) = &self.inner else {
            return;
        };
        if let Err(e) = listener.on_data_changed(&event) {
            tracing::warn!(
                subject_id = %event.subject_id,
                event_type = event.event_type.as_str(),
                error = %e,
                "数据变更通知失败"
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}
