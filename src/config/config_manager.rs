// ==========================================
// 电压控制申请系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// EngineConfig - 引擎配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub acceptance_window_secs: i64, // 受理时限
    pub late_after_secs: i64,        // ACCEPTED 超过此时长未推进即标记 LATE
    pub sweep_interval_secs: u64,    // 超时扫描间隔
    pub list_default_limit: usize,
    pub list_max_limit: usize,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acceptance_window_secs: 300,
            late_after_secs: 300,
            sweep_interval_secs: 60,
            list_default_limit: 50,
            list_max_limit: 100,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置, 不存在时取默认值
    ///
    /// 值无法解析时返回错误 (不静默回退)
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| format!("配置项 {} 解析失败 (value={}): {}", key, raw, e).into()),
        }
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 加载引擎配置 (缺省项取默认值)
    pub fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            acceptance_window_secs: self
                .get_parsed_or_default(config_keys::ACCEPTANCE_WINDOW_SECS, defaults.acceptance_window_secs)?,
            late_after_secs: self.get_parsed_or_default(config_keys::LATE_AFTER_SECS, defaults.late_after_secs)?,
            sweep_interval_secs: self
                .get_parsed_or_default(config_keys::SWEEP_INTERVAL_SECS, defaults.sweep_interval_secs)?,
            list_default_limit: self
                .get_parsed_or_default(config_keys::LIST_DEFAULT_LIMIT, defaults.list_default_limit)?,
            list_max_limit: self.get_parsed_or_default(config_keys::LIST_MAX_LIMIT, defaults.list_max_limit)?,
            log_level: self
                .get_config_value(config_keys::LOG_LEVEL)?
                .unwrap_or(defaults.log_level),
            log_json: self.get_parsed_or_default(config_keys::LOG_JSON, defaults.log_json)?,
        };

        if config.acceptance_window_secs < 0 || config.late_after_secs < 0 {
            return Err(format!(
                "时限配置不能为负: acceptance_window_secs={}, late_after_secs={}",
                config.acceptance_window_secs, config.late_after_secs
            )
            .into());
        }
        if config.list_default_limit == 0 || config.list_default_limit > config.list_max_limit {
            return Err(format!(
                "分页配置无效: list_default_limit={}, list_max_limit={}",
                config.list_default_limit, config.list_max_limit
            )
            .into());
        }

        Ok(config)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 时限
    pub const ACCEPTANCE_WINDOW_SECS: &str = "acceptance_window_secs";
    pub const LATE_AFTER_SECS: &str = "late_after_secs";

    // 超时扫描
    pub const SWEEP_INTERVAL_SECS: &str = "sweep_interval_secs";

    // 列表分页
    pub const LIST_DEFAULT_LIMIT: &str = "list_default_limit";
    pub const LIST_MAX_LIMIT: &str = "list_max_limit";

    // 日志
    pub const LOG_LEVEL: &str = "log_level";
    pub const LOG_JSON: &str = "log_json";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let manager = setup();
        assert_eq!(manager.load_engine_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_overrides_and_snapshot() {
        let manager = setup();
        manager
            .set_global_config_value(config_keys::ACCEPTANCE_WINDOW_SECS, "120")
            .unwrap();
        manager.set_global_config_value(config_keys::LOG_JSON, "true").unwrap();
        manager
            .set_global_config_value(config_keys::ACCEPTANCE_WINDOW_SECS, "180")
            .unwrap();

        let config = manager.load_engine_config().unwrap();
        assert_eq!(config.acceptance_window_secs, 180);
        assert!(config.log_json);
        assert_eq!(config.late_after_secs, 300);

        let snapshot: HashMap<String, String> =
            serde_json::from_str(&manager.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_unparsable_value_is_error() {
        let manager = setup();
        manager
            .set_global_config_value(config_keys::SWEEP_INTERVAL_SECS, "soon")
            .unwrap();
        assert!(manager.load_engine_config().is_err());
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let manager = setup();
        manager
            .set_global_config_value(config_keys::LIST_DEFAULT_LIMIT, "500")
            .unwrap();
        assert!(manager.load_engine_config().is_err());
    }
}
