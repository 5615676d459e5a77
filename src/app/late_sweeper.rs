// ==========================================
// 电压控制申请系统 - 超时申请扫描任务
// ==========================================
// 周期调用 mark_late_accepted
// - 单飞: 上一轮未结束时本轮跳过
// - 可取消: watch 通道通知退出
// - 每轮记录完成 / 失败日志
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::SolicitationApi;

/// 扫描间隔覆盖 (秒)
pub const SWEEP_INTERVAL_ENV: &str = "VOLTAGE_CONTROL_SWEEP_INTERVAL_SECS";

/// 单轮扫描结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    Completed { marked: Vec<i64> },
    Skipped,
    Failed { reason: String },
}

pub struct LateSweeper {
    api: Arc<SolicitationApi>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

/// 运行中的扫描任务句柄
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// 通知退出并等待任务结束 (含正在执行的一轮)
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            tracing::warn!("超时扫描任务异常退出: {}", e);
        }
    }
}

impl LateSweeper {
    pub fn new(api: Arc<SolicitationApi>, interval: Duration) -> Self {
        Self {
            api,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 按配置创建, 环境变量可覆盖扫描间隔
    pub fn from_config(api: Arc<SolicitationApi>) -> Self {
        let configured = api.config().sweep_interval_secs;
        let secs = interval_secs_from_env().unwrap_or(configured).max(1);
        Self::new(api, Duration::from_secs(secs))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 执行一轮扫描
    pub async fn run_once(&self) -> SweepOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("上一轮超时扫描仍在执行, 本轮跳过");
            return SweepOutcome::Skipped;
        }

        let api = self.api.clone();
        let result = tokio::task::spawn_blocking(move || api.mark_late_accepted()).await;
        self.running.store(false, Ordering::Release);

        match result {
            Ok(Ok(marked)) => {
                tracing::info!(count = marked.len(), "超时扫描完成");
                SweepOutcome::Completed { marked }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "超时扫描失败");
                SweepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "超时扫描任务崩溃");
                SweepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 启动后台扫描任务
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let sweeper = self;

        let join = tokio::spawn(async move {
            tracing::info!(interval_secs = sweeper.interval.as_secs(), "超时扫描任务已启动");
            let mut ticker = tokio::time::interval(sweeper.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // 本轮结束前不响应退出信号, stop 会等到本轮完成
                        sweeper.run_once().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("超时扫描任务已停止");
        });

        SweeperHandle { shutdown, join }
    }
}

fn interval_secs_from_env() -> Option<u64> {
    std::env::var(SWEEP_INTERVAL_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
