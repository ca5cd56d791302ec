// ==========================================
// 阅卷点试卷调配系统 - 性能统计
// ==========================================
// 职责: 接口耗时 + SQL 语句计数 + 慢 SQL 日志（target: perf / slow_sql）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 强制开启/关闭 SQL 统计
pub const ENV_PERF_SQL: &str = "EXAM_BALANCER_PERF_SQL";
/// 慢 SQL 阈值（毫秒）
pub const ENV_SLOW_SQL_MS: &str = "EXAM_BALANCER_SLOW_SQL_MS";

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static PERF_DEPTH: Cell<u32> = const { Cell::new(0) };
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
    static SLOW_SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn truncate_sql(sql: &str, max_len: usize) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match s.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s,
    }
}

/// 安装 SQLite 语句 trace/profile
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `EXAM_BALANCER_PERF_SQL=1` 强制开启（`=0` 强制关闭）
/// - `EXAM_BALANCER_SLOW_SQL_MS=50` 配置慢 SQL 阈值
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var(ENV_PERF_SQL) {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };

    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var(ENV_SLOW_SQL_MS)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(sql_trace_callback));
    conn.profile(Some(sql_profile_callback));
}

fn guard_active() -> bool {
    PERF_DEPTH.with(|d| d.get() > 0)
}

fn sql_trace_callback(_sql: &str) {
    if PERF_SQL_ENABLED.load(Ordering::Relaxed) && guard_active() {
        SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms = ms,
        sql = %truncate_sql(sql, 300),
        "慢查询"
    );
    if guard_active() {
        SLOW_SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 当前线程累计 SQL 语句数（仅统计 PerfGuard 作用域内）
pub fn sql_count() -> u64 {
    SQL_COUNT.with(|c| c.get())
}

/// 性能统计 Guard：Drop 时输出 elapsed_ms + SQL 语句数 + 慢 SQL 数
///
/// ```ignore
/// let _perf = exam_balancer::perf::PerfGuard::new("get_moves");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
    slow_sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            sql_start: sql_count(),
            slow_sql_start: SLOW_SQL_COUNT.with(|c| c.get()),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let sql_count = sql_count().saturating_sub(self.sql_start);
        let slow_sql_count = SLOW_SQL_COUNT
            .with(|c| c.get())
            .saturating_sub(self.slow_sql_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            sql_count,
            slow_sql_count,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_sql_collapses_whitespace() {
        assert_eq!(truncate_sql("SELECT *\n  FROM exam", 100), "SELECT * FROM exam");
        assert_eq!(truncate_sql("SELECT 1", 3), "SEL…");
    }

    #[test]
    fn test_is_true() {
        assert!(is_true(" Yes "));
        assert!(!is_true("0"));
    }
}
