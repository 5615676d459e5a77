// ==========================================
// 电压控制申请系统 - 服务主入口
// ==========================================
// 启动顺序: 数据库 → 配置 → 日志 → AppState → 超时扫描
// Ctrl-C 后停止扫描任务并退出
// ==========================================

use std::sync::{Arc, Mutex};

use voltage_control::app::{get_default_db_path, AppState, LateSweeper};
use voltage_control::config::ConfigManager;
use voltage_control::db::{init_schema, open_sqlite_connection};
use voltage_control::engine::{NoOpNotificationBus, SystemClock};
use voltage_control::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 获取数据库路径
    let db_path = get_default_db_path();
    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    // 加载配置后初始化日志
    let config = ConfigManager::from_connection(conn.clone())?.load_engine_config()?;
    logging::init(&config.log_level, config.log_json);

    tracing::info!("==================================================");
    tracing::info!("{} - 系统版本: {}", voltage_control::APP_NAME, voltage_control::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let state = AppState::from_connection(
        db_path,
        conn,
        config,
        Arc::new(NoOpNotificationBus),
        Arc::new(SystemClock),
    )?;

    let sweeper = LateSweeper::from_config(state.solicitation_api.clone());
    let handle = sweeper.spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("收到退出信号, 正在停止...");
    handle.stop().await;

    Ok(())
}
