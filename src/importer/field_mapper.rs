// ==========================================
// 阅卷点试卷调配系统 - 字段映射器
// ==========================================
// 职责: 原始行 → 考试/评卷人记录 + 类型转换
// 表头: COD_SEDE, COD_ASIGNATURA, FECHA, EXAMENES, EVALUADORES
//       可选 UBICACION（阅卷点名称）、ASIGNATURA（科目名称）
// ==========================================

use crate::domain::site::{EvaluatorRecord, ExamRecord, SiteInfo, SubjectInfo};
use crate::domain::types::{SiteId, SubjectId};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRecord;
use chrono::NaiveDate;

pub mod columns {
    pub const SITE: &str = "COD_SEDE";
    pub const SITE_NAME: &str = "UBICACION";
    pub const SUBJECT: &str = "COD_ASIGNATURA";
    pub const SUBJECT_NAME: &str = "ASIGNATURA";
    pub const DATE: &str = "FECHA";
    pub const EXAMS: &str = "EXAMENES";
    pub const EVALUATORS: &str = "EVALUADORES";
}

/// 支持的日期格式（按顺序尝试）
const DATE_FORMATS: [&str; 3] = ["%d/%m/%y", "%Y-%m-%d", "%d/%m/%Y"];

/// 单行映射结果（含可选的主数据）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRow<T> {
    pub record: T,
    pub site: Option<SiteInfo>,
    pub subject: Option<SubjectInfo>,
}

pub struct FieldMapper;

impl FieldMapper {
    /// 映射考试记录行
    ///
    /// # 参数
    /// - row_number: 数据行号（从 1 开始，不含表头），用于错误定位
    pub fn map_exam_row(&self, row: &RawRecord, row_number: usize) -> ImportResult<MappedRow<ExamRecord>> {
        let site_id = SiteId(self.require_i64(row, columns::SITE, row_number)?);
        let subject_id = SubjectId(self.require_i64(row, columns::SUBJECT, row_number)?);
        let exam_date = self.require_date(row, columns::DATE, row_number)?;
        let exam_count = self.require_count(row, columns::EXAMS, row_number)?;

        Ok(MappedRow {
            record: ExamRecord {
                site_id,
                subject_id,
                exam_date,
                exam_count,
            },
            site: self.site_info(row, site_id),
            subject: self.subject_info(row, subject_id),
        })
    }

    /// 映射评卷人记录行
    pub fn map_evaluator_row(
        &self,
        row: &RawRecord,
        row_number: usize,
    ) -> ImportResult<MappedRow<EvaluatorRecord>> {
        let site_id = SiteId(self.require_i64(row, columns::SITE, row_number)?);
        let subject_id = SubjectId(self.require_i64(row, columns::SUBJECT, row_number)?);
        let evaluator_count = self.require_count(row, columns::EVALUATORS, row_number)?;

        Ok(MappedRow {
            record: EvaluatorRecord {
                site_id,
                subject_id,
                evaluator_count,
            },
            site: self.site_info(row, site_id),
            subject: self.subject_info(row, subject_id),
        })
    }

    fn site_info(&self, row: &RawRecord, site_id: SiteId) -> Option<SiteInfo> {
        self.get_string(row, columns::SITE_NAME).map(|location| SiteInfo {
            site_id,
            location,
        })
    }

    fn subject_info(&self, row: &RawRecord, subject_id: SubjectId) -> Option<SubjectInfo> {
        self.get_string(row, columns::SUBJECT_NAME).map(|name| SubjectInfo {
            subject_id,
            name,
        })
    }

    /// 提取非空字符串（表头大小写不敏感）
    fn get_string(&self, row: &RawRecord, key: &str) -> Option<String> {
        let value = row.get(key).or_else(|| {
            row.iter()
                .find(|(header, _)| header.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })?;
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn require_string(&self, row: &RawRecord, key: &str, row_number: usize) -> ImportResult<String> {
        self.get_string(row, key).ok_or_else(|| ImportError::MissingField {
            row: row_number,
            field: key.to_string(),
        })
    }

    /// 解析整数（Excel 数值单元格可能带 ".0"）
    fn require_i64(&self, row: &RawRecord, key: &str, row_number: usize) -> ImportResult<i64> {
        let value = self.require_string(row, key, row_number)?;
        if let Ok(v) = value.parse::<i64>() {
            return Ok(v);
        }
        match value.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
            _ => Err(ImportError::TypeConversionError {
                row: row_number,
                field: key.to_string(),
                message: format!("无法解析为整数: {}", value),
            }),
        }
    }

    fn require_count(&self, row: &RawRecord, key: &str, row_number: usize) -> ImportResult<i64> {
        let value = self.require_i64(row, key, row_number)?;
        if value < 0 {
            return Err(ImportError::NegativeValue {
                row: row_number,
                field: key.to_string(),
                value,
            });
        }
        Ok(value)
    }

    fn require_date(&self, row: &RawRecord, key: &str, row_number: usize) -> ImportResult<NaiveDate> {
        let value = self.require_string(row, key, row_number)?;
        parse_exam_date(&value).ok_or_else(|| ImportError::DateFormatError {
            row: row_number,
            field: key.to_string(),
            value,
        })
    }
}

/// 解析考试日期（dd/mm/yy、YYYY-MM-DD 或 dd/mm/YYYY）
pub fn parse_exam_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
