// ==========================================
// 阅卷点试卷调配系统 - 导入API
// ==========================================
// 职责: 考试/评卷人数据表导入（CSV / Excel）
// 流程: 读取 + 映射（整表校验）→ 主数据补齐 → 批量写入（单事务）
// 写入后由仓储发布 BulkImport 事件，缓存按科目失效
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::site::{SiteInfo, SubjectInfo};
use crate::domain::types::{SiteId, SubjectId};
use crate::importer::{ParsedSheet, SheetReader};
use crate::repository::evaluator_repo::EvaluatorRepository;
use crate::repository::exam_repo::ExamRepository;
use crate::repository::site_repo::SiteRepository;
use crate::repository::subject_repo::SubjectRepository;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 导入批次ID（用于日志追溯）
    pub batch_id: String,
    /// 写入（新增或覆盖）的记录数
    pub imported: usize,
    /// 涉及的科目
    pub subjects: Vec<SubjectId>,
    /// 涉及的阅卷点数量
    pub sites: usize,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

/// 导入API
pub struct ImportApi {
    reader: SheetReader,
    site_repo: Arc<SiteRepository>,
    subject_repo: Arc<SubjectRepository>,
    exam_repo: Arc<ExamRepository>,
    evaluator_repo: Arc<EvaluatorRepository>,
}

impl ImportApi {
    pub fn new(
        site_repo: Arc<SiteRepository>,
        subject_repo: Arc<SubjectRepository>,
        exam_repo: Arc<ExamRepository>,
        evaluator_repo: Arc<EvaluatorRepository>,
    ) -> Self {
        Self {
            reader: SheetReader::new(),
            site_repo,
            subject_repo,
            exam_repo,
            evaluator_repo,
        }
    }

    /// 导入考试记录表
    ///
    /// 必需列: COD_SEDE, COD_ASIGNATURA, FECHA, EXAMENES
    pub async fn import_exams(&self, file_path: &Path) -> ApiResult<ImportApiResponse> {
        let _perf = crate::perf::PerfGuard::new("import_exams");
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::info!(batch_id = %batch_id, file = %file_path.display(), "开始导入考试记录");

        let sheet = self.reader.read_exams(file_path)?;
        self.ensure_master_data(&sheet)?;
        let imported = self.exam_repo.upsert_batch(&sheet.records)?;

        Ok(Self::response(batch_id, imported, &sheet, started))
    }

    /// 导入评卷人记录表
    ///
    /// 必需列: COD_SEDE, COD_ASIGNATURA, EVALUADORES
    pub async fn import_evaluators(&self, file_path: &Path) -> ApiResult<ImportApiResponse> {
        let _perf = crate::perf::PerfGuard::new("import_evaluators");
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::info!(batch_id = %batch_id, file = %file_path.display(), "开始导入评卷人记录");

        let sheet = self.reader.read_evaluators(file_path)?;
        self.ensure_master_data(&sheet)?;
        let imported = self.evaluator_repo.upsert_batch(&sheet.records)?;

        Ok(Self::response(batch_id, imported, &sheet, started))
    }

    /// 补齐主数据：先确保 id 存在（外键），再用表中名称覆盖
    fn ensure_master_data<T>(&self, sheet: &ParsedSheet<T>) -> ApiResult<()> {
        self.ensure_sites(&sheet.site_ids, &sheet.sites)?;
        self.ensure_subjects(&sheet.subject_ids, &sheet.subjects)?;
        Ok(())
    }

    fn ensure_sites(&self, ids: &[SiteId], named: &[SiteInfo]) -> ApiResult<()> {
        for site_id in ids {
            self.site_repo.ensure_exists(*site_id)?;
        }
        for site in named {
            self.site_repo.upsert(site)?;
        }
        Ok(())
    }

    fn ensure_subjects(&self, ids: &[SubjectId], named: &[SubjectInfo]) -> ApiResult<()> {
        for subject_id in ids {
            self.subject_repo.ensure_exists(*subject_id)?;
        }
        for subject in named {
            self.subject_repo.upsert(subject)?;
        }
        Ok(())
    }

    fn response<T>(
        batch_id: String,
        imported: usize,
        sheet: &ParsedSheet<T>,
        started: Instant,
    ) -> ImportApiResponse {
        let elapsed_ms = started.elapsed().as_millis() as i64;
        tracing::info!(
            batch_id = %batch_id,
            imported,
            subjects = sheet.subject_ids.len(),
            elapsed_ms,
            "导入完成"
        );
        ImportApiResponse {
            batch_id,
            imported,
            subjects: sheet.subject_ids.clone(),
            sites: sheet.site_ids.len(),
            elapsed_ms,
        }
    }
}
