// ==========================================
// 阅卷点试卷调配系统 - 导入层
// ==========================================
// 职责: 外部文件 → 考试/评卷人记录
// 支持: Excel, CSV, MiniZinc .dzn 算例
// ==========================================

pub mod dzn_parser;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod sheet_reader;

pub use dzn_parser::{parse_dzn_file, parse_dzn_str, DznInstance};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{parse_exam_date, FieldMapper, MappedRow};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use sheet_reader::{ParsedSheet, SheetReader};
