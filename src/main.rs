// ==========================================
// 阅卷点试卷调配系统 - 命令行入口
// ==========================================
// 用法:
//   exam-balancer [--db <path>] moves <subject> [date]
//   exam-balancer [--db <path>] moves-by-date <subject>
//   exam-balancer [--db <path>] import-exams <file>
//   exam-balancer [--db <path>] import-evaluators <file>
//   exam-balancer [--db <path>] export <subject> <out.csv> [--date <date>]
//   exam-balancer [--db <path>] config <key> [value]
//   exam-balancer solve-dzn <file>
// 全局选项: --json  --lang <zh-CN|en|es>
// 省略 --db 时使用 EXAM_BALANCER_DB_PATH 或用户数据目录
// ==========================================

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use exam_balancer::api::ImportApiResponse;
use exam_balancer::app::{get_default_db_path, AppState};
use exam_balancer::domain::types::SubjectId;
use exam_balancer::engine::AllocationEngine;
use exam_balancer::export::summary_lines;
use exam_balancer::importer::{parse_dzn_file, parse_exam_date};
use exam_balancer::{i18n, logging, AllocationConfig};

/// 阅卷点试卷调配：以最少的调配链路均衡各阅卷点的试卷负载
#[derive(Parser, Debug)]
#[command(name = "exam-balancer", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite 数据库路径
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<String>,

    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,

    /// 输出语言（zh-CN / en / es）
    #[arg(long, global = true, value_name = "CODE")]
    lang: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 查询科目（可选单日）的调配方案
    Moves {
        #[arg(value_parser = parse_subject)]
        subject: SubjectId,
        /// dd/mm/yy 或 YYYY-MM-DD；省略时汇总全部日期
        #[arg(value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// 按考试日期逐日计算（JSON 输出）
    MovesByDate {
        #[arg(value_parser = parse_subject)]
        subject: SubjectId,
    },

    /// 导入考试记录表（CSV / Excel）
    ImportExams { file: PathBuf },

    /// 导入评卷人记录表（CSV / Excel）
    ImportEvaluators { file: PathBuf },

    /// 导出调配报表 CSV
    Export {
        #[arg(value_parser = parse_subject)]
        subject: SubjectId,
        out: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// 读取或写入全局配置
    Config { key: String, value: Option<String> },

    /// 求解 .dzn 算例（不访问数据库）
    SolveDzn { file: PathBuf },
}

fn parse_subject(raw: &str) -> Result<SubjectId, String> {
    raw.trim()
        .parse::<i64>()
        .map(SubjectId)
        .map_err(|_| format!("科目编号非法: {}", raw))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_exam_date(raw).ok_or_else(|| format!("日期格式错误（dd/mm/yy 或 YYYY-MM-DD）: {}", raw))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_import(response: &ImportApiResponse, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        return print_json(response);
    }
    println!(
        "{}",
        i18n::t_with_args(
            "import.done",
            &[
                ("count", &response.imported.to_string()),
                ("batch", &response.batch_id),
            ],
        )
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(locale) = &cli.lang {
        if !i18n::set_locale(locale) {
            return Err(format!("不支持的语言: {}", locale).into());
        }
    }

    let open_state = || AppState::new(cli.db.clone().unwrap_or_else(get_default_db_path));

    match cli.command {
        // 算例求解不需要数据库
        Command::SolveDzn { file } => {
            let instance = parse_dzn_file(&file)?;
            let engine = AllocationEngine::new(AllocationConfig::default());
            let outcome =
                tokio::task::spawn_blocking(move || engine.allocate(&instance.request)).await??;
            if cli.json {
                return print_json(&outcome.to_result());
            }
            for line in summary_lines(SubjectId(0), &outcome, &Default::default()).iter().skip(1) {
                println!("{}", line);
            }
        }
        Command::Moves { subject, date } => {
            let state = open_state()?;
            if cli.json {
                print_json(&state.allocation_api.get_moves(subject, date).await?)?;
            } else {
                for line in state.allocation_api.summarize(subject, date).await? {
                    println!("{}", line);
                }
            }
        }
        Command::MovesByDate { subject } => {
            let state = open_state()?;
            print_json(&state.allocation_api.get_moves_by_date(subject).await?)?;
        }
        Command::ImportExams { file } => {
            let response = open_state()?.import_api.import_exams(&file).await?;
            report_import(&response, cli.json)?;
        }
        Command::ImportEvaluators { file } => {
            let response = open_state()?.import_api.import_evaluators(&file).await?;
            report_import(&response, cli.json)?;
        }
        Command::Export { subject, out, date } => {
            let response = open_state()?
                .allocation_api
                .export_moves(subject, date, &out)
                .await?;
            println!(
                "{}",
                i18n::t_with_args(
                    "import.exported",
                    &[("count", &response.rows.to_string()), ("path", &response.path)],
                )
            );
        }
        Command::Config { key, value } => {
            let state = open_state()?;
            match value {
                Some(value) => state.config_manager.set_global_config_value(&key, &value)?,
                None => match state.config_manager.get_global_config_value(&key)? {
                    Some(value) => println!("{}", value),
                    None => println!("{} 未设置", key),
                },
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    tracing::debug!("{} v{}", exam_balancer::APP_NAME, exam_balancer::VERSION);

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_moves_with_date_and_global_flags() {
        let cli = Cli::try_parse_from([
            "exam-balancer",
            "moves",
            "15",
            "08/06/23",
            "--json",
            "--db",
            "data.db",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.db.as_deref(), Some("data.db"));
        match cli.command {
            Command::Moves { subject, date } => {
                assert_eq!(subject, SubjectId(15));
                assert_eq!(date, NaiveDate::from_ymd_opt(2023, 6, 8));
            }
            other => panic!("expected moves, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_date_is_optional() {
        let cli = Cli::try_parse_from(["exam-balancer", "export", "15", "out.csv"]).unwrap();
        match cli.command {
            Command::Export { subject, out, date } => {
                assert_eq!(subject, SubjectId(15));
                assert_eq!(out, PathBuf::from("out.csv"));
                assert_eq!(date, None);
            }
            other => panic!("expected export, got {:?}", other),
        }

        let cli = Cli::try_parse_from([
            "exam-balancer",
            "export",
            "15",
            "out.csv",
            "--date",
            "2023-06-09",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Export { date: Some(d), .. } if d == NaiveDate::from_ymd_opt(2023, 6, 9).unwrap()
        ));
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        assert!(Cli::try_parse_from(["exam-balancer", "moves", "abc"]).is_err());
        assert!(Cli::try_parse_from(["exam-balancer", "moves", "15", "31-31-2023"]).is_err());
        assert!(Cli::try_parse_from(["exam-balancer", "shuffle"]).is_err());
        assert!(Cli::try_parse_from(["exam-balancer"]).is_err());
    }
}
