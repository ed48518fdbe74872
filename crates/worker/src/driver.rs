//! 任务驱动器
//!
//! 持有固定大小的worker循环池。池大小在构造时确定，不做进程内
//! 弹性伸缩 —— 吞吐靠部署更多worker进程水平扩展。

use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sentinel_core::{SentinelError, SentinelResult};

use crate::context::WorkerContext;
use crate::worker_loop::run_worker_loop;

/// Worker池驱动器
///
/// 对宿主进程暴露的控制面只有 `start` / `stop` / `is_running`，
/// 本子系统没有自己的网络端口。
pub struct TaskDriver {
    ctx: Arc<WorkerContext>,
    shutdown_tx: RwLock<Option<watch::Sender<bool>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    is_running: RwLock<bool>,
}

impl TaskDriver {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self {
            ctx,
            shutdown_tx: RwLock::new(None),
            handles: Mutex::new(Vec::new()),
            is_running: RwLock::new(false),
        }
    }

    /// 启动worker池
    pub async fn start(&self) -> SentinelResult<()> {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            return Err(SentinelError::Internal("任务驱动器已在运行".to_string()));
        }

        let pool_size = self.ctx.config.max_parallel_tasks;
        info!(worker_id = %self.ctx.worker_id, pool_size, "启动任务驱动器");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut handles = self.handles.lock().await;
        handles.clear();
        for slot in 0..pool_size {
            let ctx = Arc::clone(&self.ctx);
            let rx = shutdown_rx.clone();
            handles.push(tokio::spawn(run_worker_loop(ctx, slot, rx)));
        }

        *self.shutdown_tx.write().await = Some(shutdown_tx);
        *is_running = true;
        info!(pool_size, "任务驱动器启动完成");
        Ok(())
    }

    /// 停止worker池
    ///
    /// 发出关闭信号后逐个等待循环自然退出：在途执行不会被强行
    /// 中断，停止返回时所有槽位都已结束。
    pub async fn stop(&self) -> SentinelResult<()> {
        let mut is_running = self.is_running.write().await;
        if !*is_running {
            return Ok(());
        }

        info!(worker_id = %self.ctx.worker_id, "停止任务驱动器");
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            // 所有接收端都已退出时send会失败，无需处理
            let _ = tx.send(true);
        }

        let handles: Vec<JoinHandle<()>> = self.handles.lock().await.drain(..).collect();
        for (slot, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(slot, "等待worker循环退出失败: {e}");
            }
        }

        *is_running = false;
        info!("任务驱动器已停止");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}
