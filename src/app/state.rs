// ==========================================
// 电压控制申请系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::SolicitationApi;
use crate::config::{ConfigManager, EngineConfig};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::{
    Clock, NoOpNotificationBus, NotificationBus, SystemClock, TransitionAuthority,
};
use crate::repository::{
    SolicitationRepository, SolicitationUpdateRepository, SubstationRepository,
    UserCompanyRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 引擎配置快照
    pub config: EngineConfig,

    /// 申请工作流API
    pub solicitation_api: Arc<SolicitationApi>,

    /// 申请事件日志仓储
    pub solicitation_repo: Arc<SolicitationRepository>,

    /// 变电站参考数据（装载用）
    pub substation_repo: Arc<SubstationRepository>,

    /// 用户公司归属（装载用）
    pub user_company_repo: Arc<UserCompanyRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表
    /// 2. 从 config_kv 加载配置
    /// 3. 使用系统时钟和空操作通知总线创建API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        match read_schema_version(&conn) {
            Ok(Some(v)) if v != CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    "schema_version 不一致: 数据库={}, 期望={}",
                    v,
                    CURRENT_SCHEMA_VERSION
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("读取 schema_version 失败: {}", e),
        }
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;
        let config = config_manager
            .load_engine_config()
            .map_err(|e| format!("配置加载失败: {}", e))?;

        Self::from_connection(
            db_path,
            conn,
            config,
            Arc::new(NoOpNotificationBus),
            Arc::new(SystemClock),
        )
    }

    /// 从已建表的连接装配 (可注入通知总线与时钟)
    pub fn from_connection(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        config: EngineConfig,
        notification_bus: Arc<dyn NotificationBus>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let solicitation_repo = Arc::new(SolicitationRepository::new(conn.clone()));
        let update_repo = Arc::new(SolicitationUpdateRepository::new(conn.clone()));
        let substation_repo = Arc::new(SubstationRepository::new(conn.clone()));
        let user_company_repo = Arc::new(UserCompanyRepository::new(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn).map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let authority = Arc::new(TransitionAuthority::new(config.acceptance_window_secs));

        // ==========================================
        // 初始化API层
        // ==========================================
        let solicitation_api = Arc::new(SolicitationApi::new(
            solicitation_repo.clone(),
            update_repo,
            substation_repo.clone(),
            user_company_repo.clone(),
            notification_bus,
            authority,
            clock,
            config.clone(),
        ));

        tracing::info!(
            acceptance_window_secs = config.acceptance_window_secs,
            late_after_secs = config.late_after_secs,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            config,
            solicitation_api,
            solicitation_repo,
            substation_repo,
            user_company_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: VOLTAGE_CONTROL_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("VOLTAGE_CONTROL_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./voltage_control.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("voltage-control");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("voltage_control.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_temp_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();

        let state = AppState::new(path.clone()).unwrap();
        assert_eq!(state.db_path, path);
        assert_eq!(state.config, EngineConfig::default());
        assert_eq!(state.solicitation_api.current_stream_token().unwrap(), 0);
    }
}
