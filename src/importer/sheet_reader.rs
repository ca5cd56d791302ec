// ==========================================
// 阅卷点试卷调配系统 - 数据表读取
// ==========================================
// 流程: 文件解析 → 字段映射 → 主数据去重
// 规则: 任一行映射失败则整表拒绝（不做部分导入）
// ==========================================

use crate::domain::site::{EvaluatorRecord, ExamRecord, SiteInfo, SubjectInfo};
use crate::domain::types::{SiteId, SubjectId};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::{FieldMapper, MappedRow};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// 读取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSheet<T> {
    pub records: Vec<T>,
    /// 表中出现的全部阅卷点 id（去重、升序）
    pub site_ids: Vec<SiteId>,
    /// 表中出现的全部科目 id（去重、升序）
    pub subject_ids: Vec<SubjectId>,
    /// 带名称的阅卷点（同 id 以最后一行为准）
    pub sites: Vec<SiteInfo>,
    /// 带名称的科目（同 id 以最后一行为准）
    pub subjects: Vec<SubjectInfo>,
}

impl<T: HasKeys> ParsedSheet<T> {
    fn collect<F>(rows: &[RawRecord], map: F) -> ImportResult<Self>
    where
        F: Fn(&RawRecord, usize) -> ImportResult<MappedRow<T>>,
    {
        let mut records = Vec::with_capacity(rows.len());
        let mut site_ids = BTreeSet::new();
        let mut subject_ids = BTreeSet::new();
        let mut sites = BTreeMap::new();
        let mut subjects = BTreeMap::new();

        for (idx, row) in rows.iter().enumerate() {
            let mapped = map(row, idx + 1)?;
            let (site_id, subject_id) = mapped.record.keys();
            site_ids.insert(site_id);
            subject_ids.insert(subject_id);
            if let Some(site) = mapped.site {
                sites.insert(site.site_id, site);
            }
            if let Some(subject) = mapped.subject {
                subjects.insert(subject.subject_id, subject);
            }
            records.push(mapped.record);
        }

        Ok(Self {
            records,
            site_ids: site_ids.into_iter().collect(),
            subject_ids: subject_ids.into_iter().collect(),
            sites: sites.into_values().collect(),
            subjects: subjects.into_values().collect(),
        })
    }
}

/// 记录所属的 (阅卷点, 科目)
pub trait HasKeys {
    fn keys(&self) -> (SiteId, SubjectId);
}

impl HasKeys for ExamRecord {
    fn keys(&self) -> (SiteId, SubjectId) {
        (self.site_id, self.subject_id)
    }
}

impl HasKeys for EvaluatorRecord {
    fn keys(&self) -> (SiteId, SubjectId) {
        (self.site_id, self.subject_id)
    }
}

pub struct SheetReader {
    parser: UniversalFileParser,
    mapper: FieldMapper,
}

impl Default for SheetReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetReader {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
            mapper: FieldMapper,
        }
    }

    /// 读取考试记录表
    pub fn read_exams<P: AsRef<Path>>(&self, path: P) -> ImportResult<ParsedSheet<ExamRecord>> {
        let path = path.as_ref();
        let rows = self.parser.parse(path)?;
        debug!(file = %path.display(), rows = rows.len(), "考试记录表已解析");

        let sheet = ParsedSheet::collect(&rows, |row, n| self.mapper.map_exam_row(row, n))?;
        info!(
            file = %path.display(),
            records = sheet.records.len(),
            subjects = sheet.subject_ids.len(),
            "考试记录表读取完成"
        );
        Ok(sheet)
    }

    /// 读取评卷人记录表
    pub fn read_evaluators<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> ImportResult<ParsedSheet<EvaluatorRecord>> {
        let path = path.as_ref();
        let rows = self.parser.parse(path)?;
        debug!(file = %path.display(), rows = rows.len(), "评卷人记录表已解析");

        let sheet = ParsedSheet::collect(&rows, |row, n| self.mapper.map_evaluator_row(row, n))?;
        info!(
            file = %path.display(),
            records = sheet.records.len(),
            subjects = sheet.subject_ids.len(),
            "评卷人记录表读取完成"
        );
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ImportError;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_read_exams_collects_master_data() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "COD_SEDE,UBICACION,COD_ASIGNATURA,ASIGNATURA,FECHA,EXAMENES").unwrap();
        writeln!(file, "2,Campus Sur,5,Historia,08/06/23,12").unwrap();
        writeln!(file, "1,,5,Historia,08/06/23,30").unwrap();
        writeln!(file, "2,Campus Sur,6,,09/06/23,4").unwrap();

        let sheet = SheetReader::new().read_exams(file.path()).unwrap();
        assert_eq!(sheet.records.len(), 3);
        assert_eq!(sheet.site_ids, vec![SiteId(1), SiteId(2)]);
        assert_eq!(sheet.subject_ids, vec![SubjectId(5), SubjectId(6)]);
        assert_eq!(sheet.sites.len(), 1);
        assert_eq!(sheet.sites[0].location, "Campus Sur");
        assert_eq!(sheet.subjects.len(), 1);
    }

    #[test]
    fn test_bad_row_rejects_whole_sheet() {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "COD_SEDE,COD_ASIGNATURA,EVALUADORES").unwrap();
        writeln!(file, "1,5,2").unwrap();
        writeln!(file, "2,5,dos").unwrap();

        let result = SheetReader::new().read_evaluators(file.path());
        assert!(matches!(
            result,
            Err(ImportError::TypeConversionError { row: 2, .. })
        ));
    }
}
