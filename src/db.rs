// ==========================================
// 电压控制申请系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表 (init_schema)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS substations_table (
    table_code TEXT NOT NULL,
    company_code TEXT NOT NULL,
    name TEXT,
    PRIMARY KEY (table_code, company_code)
);

CREATE TABLE IF NOT EXISTS substation (
    code TEXT NOT NULL,
    company_code TEXT NOT NULL,
    name TEXT,
    table_code TEXT,
    PRIMARY KEY (code, company_code)
);

CREATE TABLE IF NOT EXISTS user_company (
    user_id TEXT PRIMARY KEY,
    company_code TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS solicitation_group (
    group_id TEXT PRIMARY KEY,
    requester_id TEXT NOT NULL,
    creation_total_time INTEGER NOT NULL CHECK (creation_total_time >= 0),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS voltage_control_solicitation (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    equipment TEXT NOT NULL,
    action TEXT NOT NULL,
    substation_code TEXT NOT NULL,
    company_code TEXT NOT NULL,
    amount INTEGER,
    voltage TEXT,
    staggered INTEGER,
    voltage_primary TEXT,
    voltage_secondary TEXT,
    requester_id TEXT NOT NULL,
    group_id TEXT REFERENCES solicitation_group(group_id)
);

CREATE TABLE IF NOT EXISTS solicitation_event (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    solicitation_id INTEGER NOT NULL REFERENCES voltage_control_solicitation(id),
    actor TEXT,
    status TEXT NOT NULL,
    time_stamp INTEGER NOT NULL,
    justification TEXT
);

CREATE INDEX IF NOT EXISTS idx_solicitation_event_head
    ON solicitation_event (solicitation_id, time_stamp DESC, event_id DESC);

CREATE TABLE IF NOT EXISTS solicitation_updates (
    stream_id INTEGER PRIMARY KEY AUTOINCREMENT,
    solicitation_id INTEGER NOT NULL REFERENCES voltage_control_solicitation(id),
    user_id TEXT,
    type TEXT NOT NULL,
    content TEXT NOT NULL
);
"#;

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

/// 建表 (可重复执行) 并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT INTO schema_version (version) \
         SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM schema_version WHERE version = ?1)",
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
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
