// ==========================================
// 阅卷点试卷调配系统 - 调配数据源
// ==========================================
// 职责: 为调配服务提供原始考试/评卷人记录（外部协作者接口）
// 实现者:
// - RepositoryDataSource: SQLite 仓储
// - InMemoryDataSource: 进程内记录（测试 / .dzn 算例）
// ==========================================

use crate::domain::site::{EvaluatorRecord, ExamRecord};
use crate::domain::types::{AllocationKey, SubjectId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::evaluator_repo::EvaluatorRepository;
use crate::repository::exam_repo::ExamRepository;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait AllocationDataSource: Send + Sync {
    /// 按调配键读取考试记录
    async fn load_exam_records(&self, key: &AllocationKey) -> RepositoryResult<Vec<ExamRecord>>;

    /// 读取科目的评卷人记录
    async fn load_evaluator_records(
        &self,
        subject_id: SubjectId,
    ) -> RepositoryResult<Vec<EvaluatorRecord>>;
}

// ==========================================
// RepositoryDataSource - SQLite 仓储数据源
// ==========================================
pub struct RepositoryDataSource {
    exam_repo: Arc<ExamRepository>,
    evaluator_repo: Arc<EvaluatorRepository>,
}

impl RepositoryDataSource {
    pub fn new(exam_repo: Arc<ExamRepository>, evaluator_repo: Arc<EvaluatorRepository>) -> Self {
        Self {
            exam_repo,
            evaluator_repo,
        }
    }
}

#[async_trait]
impl AllocationDataSource for RepositoryDataSource {
    async fn load_exam_records(&self, key: &AllocationKey) -> RepositoryResult<Vec<ExamRecord>> {
        self.exam_repo.find_by_key(key)
    }

    async fn load_evaluator_records(
        &self,
        subject_id: SubjectId,
    ) -> RepositoryResult<Vec<EvaluatorRecord>> {
        self.evaluator_repo.find_by_subject(subject_id)
    }
}

// ==========================================
// InMemoryDataSource - 进程内数据源
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    exams: RwLock<Vec<ExamRecord>>,
    evaluators: RwLock<Vec<EvaluatorRecord>>,
}

impl InMemoryDataSource {
    pub fn new(exams: Vec<ExamRecord>, evaluators: Vec<EvaluatorRecord>) -> Self {
        Self {
            exams: RwLock::new(exams),
            evaluators: RwLock::new(evaluators),
        }
    }

    /// 替换全部考试记录（调用方负责发布变更事件）
    pub fn replace_exams(&self, exams: Vec<ExamRecord>) {
        if let Ok(mut guard) = self.exams.write() {
            *guard = exams;
        }
    }

    /// 替换全部评卷人记录（调用方负责发布变更事件）
    pub fn replace_evaluators(&self, evaluators: Vec<EvaluatorRecord>) {
        if let Ok(mut guard) = self.evaluators.write() {
            *guard = evaluators;
        }
    }
}

#[async_trait]
impl AllocationDataSource for InMemoryDataSource {
    async fn load_exam_records(&self, key: &AllocationKey) -> RepositoryResult<Vec<ExamRecord>> {
        let exams = self
            .exams
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(exams
            .iter()
            .filter(|r| r.subject_id == key.subject_id && key.covers_date(r.exam_date))
            .cloned()
            .collect())
    }

    async fn load_evaluator_records(
        &self,
        subject_id: SubjectId,
    ) -> RepositoryResult<Vec<EvaluatorRecord>> {
        let evaluators = self
            .evaluators
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(evaluators
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect())
    }
}
