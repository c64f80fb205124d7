// ==========================================
// 兽药残留合规核心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等（CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
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

/// 初始化表结构
///
/// 说明: lab_sample 不存 pass/fail，判定结果每次读取时重算
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS treatment_record (
            record_id TEXT PRIMARY KEY,
            substance_name TEXT NOT NULL,
            dose REAL NOT NULL,
            dose_unit TEXT NOT NULL,
            route TEXT NOT NULL,
            species TEXT NOT NULL,
            treatment_date TEXT NOT NULL,
            animal_id TEXT NOT NULL,
            recorded_by TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            cached_suggested_days INTEGER,
            cached_withdrawal_end TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_treatment_animal
            ON treatment_record (animal_id, treatment_date);

        CREATE TABLE IF NOT EXISTS lab_sample (
            sample_id TEXT PRIMARY KEY,
            substance_name TEXT NOT NULL,
            measured_value REAL NOT NULL,
            unit TEXT NOT NULL,
            scope TEXT NOT NULL,
            batch_id TEXT NOT NULL,
            farmer_id TEXT,
            animal_id TEXT NOT NULL,
            test_date TEXT NOT NULL,
            lab_name TEXT NOT NULL,
            uploaded_by TEXT NOT NULL,
            uploaded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_lab_sample_animal
            ON lab_sample (animal_id, test_date);

        CREATE TABLE IF NOT EXISTS alert (
            alert_id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            severity TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            UNIQUE (kind, subject_id, message)
        );
        "#,
    )
}
