// ==========================================
// 珠宝维修定价系统 - 性能统计
// ==========================================
// 职责: 定价操作耗时 + SQL 语句计数 + 慢 SQL 日志
// 日志 target: perf / slow_sql
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// SQL 统计开关环境变量
pub const PERF_SQL_ENV: &str = "REPAIR_PRICING_PERF_SQL";
/// 慢 SQL 阈值环境变量（毫秒）
pub const SLOW_SQL_MS_ENV: &str = "REPAIR_PRICING_SLOW_SQL_MS";

static SQL_STATS_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static ACTIVE_GUARDS: Cell<u32> = Cell::new(0);
    static STATEMENTS: Cell<u64> = Cell::new(0);
    static SLOW_STATEMENTS: Cell<u64> = Cell::new(0);
}

/// SQL 统计配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlStatsSettings {
    pub enabled: bool,
    pub slow_ms: u64,
}

impl SqlStatsSettings {
    /// 从环境变量读取
    ///
    /// - Debug 构建默认开启，Release 默认关闭
    /// - 慢 SQL 阈值默认 Debug 50ms / Release 200ms
    pub fn from_env() -> Self {
        let enabled = std::env::var(PERF_SQL_ENV)
            .map(|v| flag_on(&v))
            .unwrap_or(cfg!(debug_assertions));
        let slow_ms = std::env::var(SLOW_SQL_MS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
        Self { enabled, slow_ms }
    }
}

fn flag_on(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn shorten_sql(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// 为连接安装 SQLite trace/profile 回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = SqlStatsSettings::from_env();
    SQL_STATS_ENABLED.store(settings.enabled, Ordering::Relaxed);
    SLOW_SQL_MS.store(settings.slow_ms, Ordering::Relaxed);

    if settings.enabled {
        conn.trace(Some(on_statement));
        conn.profile(Some(on_statement_profiled));
    } else {
        conn.trace(None);
        conn.profile(None);
    }
}

fn guard_active() -> bool {
    ACTIVE_GUARDS.with(|d| d.get() > 0)
}

fn on_statement(_sql: &str) {
    if SQL_STATS_ENABLED.load(Ordering::Relaxed) && guard_active() {
        STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_statement_profiled(sql: &str, duration: Duration) {
    if !SQL_STATS_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms = ms,
        sql = %shorten_sql(sql, 400),
        "slow sql"
    );
    if guard_active() {
        SLOW_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 性能统计 Guard：Drop 时输出 elapsed_ms + SQL 语句数 + 慢 SQL 数
///
/// ```ignore
/// let perf = repair_pricing::perf::PerfGuard::new("recalc_all");
/// // ...
/// let elapsed = perf.elapsed_ms();
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    statements_at_start: u64,
    slow_at_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        ACTIVE_GUARDS.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            statements_at_start: STATEMENTS.with(|c| c.get()),
            slow_at_start: SLOW_STATEMENTS.with(|c| c.get()),
        }
    }

    /// 自创建以来的耗时（毫秒）
    pub fn elapsed_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.statements_at_start);
        let slow_sql_count = SLOW_STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.slow_at_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.elapsed_ms(),
            sql_count,
            slow_sql_count,
            "done"
        );

        ACTIVE_GUARDS.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_sql_flattens_whitespace() {
        assert_eq!(shorten_sql("SELECT 1\n   FROM t", 100), "SELECT 1 FROM t");
        assert_eq!(shorten_sql("SELECT * FROM repair_task", 6), "SELECT…");
    }

    #[test]
    fn test_flag_values() {
        assert!(flag_on(" TRUE "));
        assert!(flag_on("1"));
        assert!(!flag_on("off"));
    }

    #[test]
    fn test_nested_guards_restore_depth() {
        {
            let outer = PerfGuard::new("outer");
            let _inner = PerfGuard::new("inner");
            assert_eq!(ACTIVE_GUARDS.with(|d| d.get()), 2);
            assert!(outer.elapsed_ms() >= 0);
        }
        assert_eq!(ACTIVE_GUARDS.with(|d| d.get()), 0);
    }
}
