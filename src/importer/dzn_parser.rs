// ==========================================
// 阅卷点试卷调配系统 - MiniZinc 算例解析器
// ==========================================
// 格式:
//   n = 4;
//   data = [| 10, 1
//           | 3, 1
//           | 2, 0
//           | 15, 1 |];
// 第 i 行（从 1 开始）对应阅卷点 i: (试卷数, 评卷人数)
// ==========================================

use crate::domain::site::{AllocationRequest, Site};
use crate::importer::error::{ImportError, ImportResult};
use std::fs;
use std::path::Path;

/// 解析后的算例
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DznInstance {
    /// 算例名（文件名去扩展名；字符串解析时为空）
    pub name: String,
    pub request: AllocationRequest,
}

/// 从文件读取算例
pub fn parse_dzn_file<P: AsRef<Path>>(path: P) -> ImportResult<DznInstance> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext != "dzn" {
        return Err(ImportError::UnsupportedFormat(ext));
    }

    let text = fs::read_to_string(path)?;
    let mut instance = parse_dzn_str(&text)?;
    instance.name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(instance)
}

/// 从文本解析算例
pub fn parse_dzn_str(text: &str) -> ImportResult<DznInstance> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let (first_idx, first) = lines.next().ok_or_else(|| ImportError::DznParseError {
        line: 1,
        message: "文件为空".to_string(),
    })?;
    let declared = parse_site_count(first, first_idx + 1)?;

    let mut sites = Vec::with_capacity(declared);
    for (idx, line) in lines {
        let line_no = idx + 1;
        // 一行内可能有多个 '|' 分隔的数据行（如 "| 15, 1 |];"）
        for chunk in line.split('|').skip(1) {
            let Some((exams, evaluators)) = parse_row(chunk, line_no)? else {
                continue;
            };
            let site_id = sites.len() as i64 + 1;
            sites.push(Site::new(site_id, exams, evaluators));
        }
    }

    if sites.len() != declared {
        return Err(ImportError::DznParseError {
            line: first_idx + 1,
            message: format!("声明 n = {}，实际数据行 {}", declared, sites.len()),
        });
    }

    Ok(DznInstance {
        name: String::new(),
        request: AllocationRequest::new(sites),
    })
}

/// 解析首行 "n = N;"
fn parse_site_count(line: &str, line_no: usize) -> ImportResult<usize> {
    let err = |message: String| ImportError::DznParseError {
        line: line_no,
        message,
    };

    let (name, value) = line
        .split_once('=')
        .ok_or_else(|| err(format!("期望 \"n = <数量>;\"，实际 {}", line.trim())))?;
    if name.trim() != "n" {
        return Err(err(format!("未知参数: {}", name.trim())));
    }
    value
        .trim()
        .trim_end_matches(';')
        .trim()
        .parse::<usize>()
        .map_err(|_| err(format!("阅卷点数量非法: {}", value.trim())))
}

/// 解析单个数据行片段；纯结束符（"];" 等）返回 None
fn parse_row(chunk: &str, line_no: usize) -> ImportResult<Option<(i64, i64)>> {
    let body = chunk.trim().trim_end_matches(';').trim_end_matches(']').trim();
    let values: Vec<&str> = body
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    match values.as_slice() {
        [] => Ok(None),
        [exams, evaluators] => {
            let parse = |v: &str| {
                v.parse::<i64>().map_err(|_| ImportError::DznParseError {
                    line: line_no,
                    message: format!("无法解析为整数: {}", v),
                })
            };
            Ok(Some((parse(exams)?, parse(evaluators)?)))
        }
        other => Err(ImportError::DznParseError {
            line: line_no,
            message: format!("每行应为 2 个数值，实际 {} 个", other.len()),
        }),
    }
}
