// ==========================================
// 质检DPU跟踪系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 集中建表语句，保证测试库与正式库 schema 一致
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
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
/// 表结构：
/// - monthly_inspection: 月度质检聚合（stages 以 JSON 列存储）
/// - year_target: 年度DPU目标（baseline/stage_targets 以 JSON 列存储）
/// - intervention_plan: 工序改进计划（payload 以 JSON 列存储）
/// - config_kv: 配置项（scope_id + key 唯一）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS monthly_inspection (
            id                      TEXT PRIMARY KEY,
            date                    TEXT NOT NULL,
            year                    INTEGER NOT NULL,
            stages_json             TEXT NOT NULL,
            total_inspections       INTEGER NOT NULL DEFAULT 0,
            total_faults            INTEGER NOT NULL DEFAULT 0,
            total_dpu               REAL NOT NULL DEFAULT 0,
            production_inspections  INTEGER NOT NULL DEFAULT 0,
            production_faults       INTEGER NOT NULL DEFAULT 0,
            production_dpu          REAL NOT NULL DEFAULT 0,
            dpdi_inspections        INTEGER NOT NULL DEFAULT 0,
            dpdi_faults             INTEGER NOT NULL DEFAULT 0,
            dpdi_dpu                REAL NOT NULL DEFAULT 0,
            signout_volume          INTEGER NOT NULL DEFAULT 0,
            updated_at              TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_monthly_inspection_year
            ON monthly_inspection(year);

        CREATE TABLE IF NOT EXISTS year_target (
            year                 INTEGER PRIMARY KEY,
            combined_target      REAL NOT NULL DEFAULT 0,
            production_target    REAL NOT NULL DEFAULT 0,
            dpdi_target          REAL NOT NULL DEFAULT 0,
            allocation_strategy  TEXT NOT NULL,
            baseline_json        TEXT NOT NULL,
            stage_targets_json   TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS intervention_plan (
            plan_id     TEXT PRIMARY KEY,
            stage_name  TEXT NOT NULL,
            year        INTEGER NOT NULL,
            payload     TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE (stage_name, year)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id  TEXT NOT NULL DEFAULT 'global',
            key       TEXT NOT NULL,
            value     TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;
    Ok(())
}

/// 打开连接并确保 schema 就绪（CLI 与测试共用入口）
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}
