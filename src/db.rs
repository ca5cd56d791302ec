// ==========================================
// 阅卷点试卷调配系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键约束 + busy_timeout）
// - 幂等建表，保证仓储/配置/导入共用同一套 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化 schema（幂等）
///
/// 表:
/// - site / subject: 主数据
/// - exam: (site_id, subject_id, exam_date) 唯一
/// - evaluator: (site_id, subject_id) 唯一
/// - config_kv: 全局配置
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS site (
            site_id INTEGER PRIMARY KEY,
            location TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS subject (
            subject_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS exam (
            site_id INTEGER NOT NULL REFERENCES site(site_id) ON DELETE CASCADE,
            subject_id INTEGER NOT NULL REFERENCES subject(subject_id) ON DELETE CASCADE,
            exam_date TEXT NOT NULL,
            exam_count INTEGER NOT NULL DEFAULT 0 CHECK (exam_count >= 0),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (site_id, subject_id, exam_date)
        );

        CREATE INDEX IF NOT EXISTS idx_exam_subject_date
          ON exam(subject_id, exam_date);

        CREATE TABLE IF NOT EXISTS evaluator (
            site_id INTEGER NOT NULL REFERENCES site(site_id) ON DELETE CASCADE,
            subject_id INTEGER NOT NULL REFERENCES subject(subject_id) ON DELETE CASCADE,
            evaluator_count INTEGER NOT NULL CHECK (evaluator_count >= 0),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (site_id, subject_id)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO evaluator (site_id, subject_id, evaluator_count) VALUES (1, 1, 3)",
            [],
        );
        assert!(result.is_err());
    }
}
