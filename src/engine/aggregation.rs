// ==========================================
// 阅卷点试卷调配系统 - 记录聚合
// ==========================================
// 职责: 将考试记录、评卷人记录按阅卷点汇总为 AllocationRequest
// 输入: ExamRecord 列表 + EvaluatorRecord 列表 + AllocationKey
// 输出: 每个阅卷点一条 Site（site_id 升序）
// ==========================================

use crate::domain::site::{AllocationRequest, EvaluatorRecord, ExamRecord, Site};
use crate::domain::types::{AllocationKey, SiteId};
use crate::engine::error::{AllocationError, EngineResult};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
struct SiteTotals {
    exams: i64,
    evaluators: i64,
}

/// 按 AllocationKey 聚合原始记录
///
/// 规则:
/// - 考试记录按科目 + 日期（date=None 时全部日期）过滤
/// - 评卷人记录只按科目过滤
/// - 同一阅卷点的多条记录求和
/// - 只出现在一侧的阅卷点另一侧计 0
pub fn aggregate_records(
    key: &AllocationKey,
    exams: &[ExamRecord],
    evaluators: &[EvaluatorRecord],
) -> EngineResult<AllocationRequest> {
    let mut totals: BTreeMap<SiteId, SiteTotals> = BTreeMap::new();

    for record in exams
        .iter()
        .filter(|r| r.subject_id == key.subject_id && key.covers_date(r.exam_date))
    {
        if record.exam_count < 0 {
            return Err(AllocationError::NegativeCount {
                site_id: record.site_id.0,
                field: "exam_count",
                value: record.exam_count,
            });
        }
        let entry = totals.entry(record.site_id).or_default();
        entry.exams = entry.exams.saturating_add(record.exam_count);
    }

    for record in evaluators.iter().filter(|r| r.subject_id == key.subject_id) {
        if record.evaluator_count < 0 {
            return Err(AllocationError::NegativeCount {
                site_id: record.site_id.0,
                field: "evaluator_count",
                value: record.evaluator_count,
            });
        }
        let entry = totals.entry(record.site_id).or_default();
        entry.evaluators = entry.evaluators.saturating_add(record.evaluator_count);
    }

    debug!(%key, sites = totals.len(), "记录聚合完成");

    Ok(totals
        .into_iter()
        .map(|(site_id, t)| Site {
            site_id,
            exam_count: t.exams,
            evaluator_count: t.evaluators,
        })
        .collect())
}

/// 校验调配请求（建模前）
///
/// - 计数不得为负
/// - site_id 在请求内唯一
pub fn validate_request(request: &AllocationRequest) -> EngineResult<()> {
    let mut seen: HashSet<SiteId> = HashSet::with_capacity(request.sites.len());
    let mut total_exams: i64 = 0;
    let mut total_evaluators: i64 = 0;

    for site in &request.sites {
        if site.exam_count < 0 {
            return Err(AllocationError::NegativeCount {
                site_id: site.site_id.0,
                field: "exam_count",
                value: site.exam_count,
            });
        }
        if site.evaluator_count < 0 {
            return Err(AllocationError::NegativeCount {
                site_id: site.site_id.0,
                field: "evaluator_count",
                value: site.evaluator_count,
            });
        }
        if !seen.insert(site.site_id) {
            return Err(AllocationError::DuplicateSite(site.site_id.0));
        }
        total_exams = total_exams.checked_add(site.exam_count).ok_or_else(|| {
            AllocationError::InvalidInput(format!("试卷总数溢出 (site_id={})", site.site_id))
        })?;
        total_evaluators = total_evaluators
            .checked_add(site.evaluator_count)
            .ok_or_else(|| {
                AllocationError::InvalidInput(format!("评卷人总数溢出 (site_id={})", site.site_id))
            })?;
    }

    Ok(())
}
