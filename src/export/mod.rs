// ==========================================
// 阅卷点试卷调配系统 - 导出层
// ==========================================

pub mod move_report;

pub use move_report::{export_move_report, site_label, summary_lines, write_move_report};
