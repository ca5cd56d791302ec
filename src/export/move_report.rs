// ==========================================
// 阅卷点试卷调配系统 - 调配报表
// ==========================================
// 职责: 调配方案 → CSV 报表 / 文本摘要
// 表头与摘要文案随当前语言切换（i18n）
// 阅卷点名称取自 site 表，缺失时回退为编号
// ==========================================

use crate::domain::allocation::{AllocationOutcome, Move};
use crate::domain::types::{SiteId, SubjectId};
use crate::i18n::{t, t_with_args};
use csv::Writer;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

/// 阅卷点显示名（名称优先，回退为编号）
pub fn site_label(site_id: SiteId, names: &HashMap<SiteId, String>) -> String {
    names
        .get(&site_id)
        .cloned()
        .unwrap_or_else(|| site_id.to_string())
}

/// 写出调配明细 CSV
///
/// # 返回
/// - 写出的数据行数（不含表头）
pub fn write_move_report<W: io::Write>(
    writer: W,
    moves: &[Move],
    names: &HashMap<SiteId, String>,
) -> csv::Result<usize> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record([
        t("export.header_from"),
        t("export.header_to"),
        t("export.header_count"),
    ])?;

    for mv in moves {
        wtr.write_record([
            site_label(mv.from_site, names),
            site_label(mv.to_site, names),
            mv.count.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(moves.len())
}

/// 写出调配明细 CSV 文件（覆盖已有文件）
pub fn export_move_report<P: AsRef<Path>>(
    path: P,
    moves: &[Move],
    names: &HashMap<SiteId, String>,
) -> csv::Result<usize> {
    let file = File::create(path.as_ref())?;
    write_move_report(file, moves, names)
}

/// 生成文本摘要（逐行）
pub fn summary_lines(
    subject_id: SubjectId,
    outcome: &AllocationOutcome,
    names: &HashMap<SiteId, String>,
) -> Vec<String> {
    let subject = subject_id.to_string();
    let mut lines = vec![t_with_args("summary.title", &[("subject", &subject)])];

    let Some(plan) = outcome.plan() else {
        lines.push(t("summary.no_data"));
        return lines;
    };

    lines.push(t_with_args("summary.mean", &[("mean", &plan.mean.to_string())]));
    if plan.moves.is_empty() {
        lines.push(t("summary.no_moves"));
        return lines;
    }

    lines.push(t_with_args(
        "summary.total_moves",
        &[("count", &plan.total_moves.to_string())],
    ));
    lines.push(t_with_args(
        "summary.exams_moved",
        &[("count", &plan.exams_moved.to_string())],
    ));
    for mv in &plan.moves {
        lines.push(t_with_args(
            "summary.move_line",
            &[
                ("from", &site_label(mv.from_site, names)),
                ("to", &site_label(mv.to_site, names)),
                ("count", &mv.count.to_string()),
            ],
        ));
    }
    lines
}
