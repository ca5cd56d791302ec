// ==========================================
// 阅卷点试卷调配系统 - 调配API
// ==========================================
// 职责: 对外提供调配查询、批量查询、报表导出、算例求解
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::allocation::{AllocationOutcome, AllocationResult};
use crate::domain::site::AllocationRequest;
use crate::domain::types::{AllocationKey, SiteId, SubjectId};
use crate::export::move_report::{export_move_report, summary_lines};
use crate::perf::PerfGuard;
use crate::repository::exam_repo::ExamRepository;
use crate::repository::site_repo::SiteRepository;
use crate::service::AllocationService;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// 单日调配结果（批量查询用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatedAllocation {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub result: AllocationResult,
}

/// 导出结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub path: String,
    pub rows: usize,
}

/// 调配API
pub struct AllocationApi {
    service: Arc<AllocationService>,
    site_repo: Arc<SiteRepository>,
    exam_repo: Arc<ExamRepository>,
}

impl AllocationApi {
    pub fn new(
        service: Arc<AllocationService>,
        site_repo: Arc<SiteRepository>,
        exam_repo: Arc<ExamRepository>,
    ) -> Self {
        Self {
            service,
            site_repo,
            exam_repo,
        }
    }

    /// 查询调配方案（科目 + 可选日期）
    ///
    /// # 返回
    /// - mean / total_moves / move_details；无评卷人数据时三者均为 null
    pub async fn get_moves(
        &self,
        subject_id: SubjectId,
        date: Option<NaiveDate>,
    ) -> ApiResult<AllocationResult> {
        let _perf = PerfGuard::new("get_moves");
        let outcome = self.get_outcome(subject_id, date).await?;
        Ok(outcome.to_result())
    }

    /// 查询完整调配结果（含分类明细）
    pub async fn get_outcome(
        &self,
        subject_id: SubjectId,
        date: Option<NaiveDate>,
    ) -> ApiResult<Arc<AllocationOutcome>> {
        let key = AllocationKey {
            subject_id,
            date,
        };
        Ok(self.service.get_allocation(key).await?)
    }

    /// 按科目的每个考试日期分别计算（并发）
    ///
    /// 单日失败不影响其他日期；任一日期失败时返回首个错误
    pub async fn get_moves_by_date(&self, subject_id: SubjectId) -> ApiResult<Vec<DatedAllocation>> {
        let _perf = PerfGuard::new("get_moves_by_date");
        let dates = self.exam_repo.find_dates(subject_id)?;
        let keys: Vec<AllocationKey> = dates
            .iter()
            .map(|d| AllocationKey::new(subject_id, *d))
            .collect();

        let mut results = Vec::with_capacity(keys.len());
        for (key, result) in self.service.get_many(&keys).await {
            let outcome = result?;
            if let Some(date) = key.date {
                results.push(DatedAllocation {
                    date,
                    result: outcome.to_result(),
                });
            }
        }
        Ok(results)
    }

    /// 文本摘要（当前语言）
    pub async fn summarize(
        &self,
        subject_id: SubjectId,
        date: Option<NaiveDate>,
    ) -> ApiResult<Vec<String>> {
        let outcome = self.get_outcome(subject_id, date).await?;
        let names = self.site_names()?;
        Ok(summary_lines(subject_id, &outcome, &names))
    }

    /// 导出调配明细到 CSV
    pub async fn export_moves(
        &self,
        subject_id: SubjectId,
        date: Option<NaiveDate>,
        path: &Path,
    ) -> ApiResult<ExportResponse> {
        let _perf = PerfGuard::new("export_moves");
        let outcome = self.get_outcome(subject_id, date).await?;
        let moves = outcome.plan().map(|p| p.moves.as_slice()).unwrap_or(&[]);
        let names = self.site_names()?;

        let rows = export_move_report(path, moves, &names)?;
        tracing::info!(path = %path.display(), rows, "调配明细已导出");
        Ok(ExportResponse {
            path: path.display().to_string(),
            rows,
        })
    }

    /// 直接求解一个算例（不读库、不走缓存）
    pub async fn solve_request(&self, request: AllocationRequest) -> ApiResult<AllocationOutcome> {
        let _perf = PerfGuard::new("solve_request");
        let engine = self.service.engine().clone();
        let outcome = tokio::task::spawn_blocking(move || engine.allocate(&request))
            .await
            .map_err(|e| ApiError::InternalError(format!("后台求解任务异常终止: {}", e)))??;
        Ok(outcome)
    }

    /// 手动失效某科目缓存
    pub fn invalidate_subject(&self, subject_id: SubjectId) {
        self.service.cache().invalidate_subject(subject_id);
    }

    fn site_names(&self) -> ApiResult<HashMap<SiteId, String>> {
        Ok(self.site_repo.display_names()?)
    }
}
