//! Worker循环
//!
//! 每个池槽位一个循环：抢占 → 解析 → 解码 → 执行 → 收尾。
//! 单次迭代内发生的任何错误都被就地消化并记录日志，一条坏任务
//! 绝不拖垮worker；循环体永远回到下一次迭代。

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use sentinel_core::{
    FailurePolicy, RunnerContext, SentinelResult, Task, TaskResult, TaskStatus,
};

use crate::acquisition::TaskAcquirer;
use crate::context::WorkerContext;

/// 运行一个worker循环直到观察到关闭信号
///
/// 关闭信号只在迭代边界（以及抢占的退避休眠中）被检查，在途的任务
/// 执行不会被打断，执行完成并收尾后循环才退出。
pub async fn run_worker_loop(
    ctx: Arc<WorkerContext>,
    slot: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(slot, worker_id = %ctx.worker_id, "worker循环启动");
    let acquirer = TaskAcquirer::new(&ctx, slot);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let Some(task) = acquirer.acquire_one(&mut shutdown_rx).await else {
            break;
        };

        let task_id = task.id;
        let task_type = task.task_type.clone();

        match execute_claimed(&ctx, slot, task).await {
            Ok(results) => {
                info!(
                    slot,
                    task_id,
                    task_type = %task_type,
                    results = results.len(),
                    "任务执行成功"
                );
                finalize(&ctx, slot, task_id, TaskStatus::Completed).await;
            }
            Err(e) => {
                error!(slot, task_id, task_type = %task_type, "任务执行失败: {e}");
                match ctx.config.on_failure {
                    FailurePolicy::MarkFailed => {
                        finalize(&ctx, slot, task_id, TaskStatus::Failed).await;
                    }
                    FailurePolicy::MarkCompleted => {
                        finalize(&ctx, slot, task_id, TaskStatus::Completed).await;
                    }
                    FailurePolicy::LeaveRunning => {
                        warn!(slot, task_id, "按策略保持RUNNING，等待外部对账回收");
                    }
                }
            }
        }
    }

    info!(slot, worker_id = %ctx.worker_id, "worker循环退出");
}

/// 解析、解码并执行一条已抢占的任务
async fn execute_claimed(
    ctx: &WorkerContext,
    slot: usize,
    task: Task,
) -> SentinelResult<Vec<TaskResult>> {
    let binding = ctx.registry.resolve(&task.task_type)?;
    let payload = binding.codec.decode(&task.payload)?;

    let runner_ctx = RunnerContext {
        task_id: task.id,
        task_type: task.task_type.clone(),
        worker_id: ctx.worker_id.clone(),
    };

    info!(
        slot,
        task_id = task.id,
        runner = binding.runner.name(),
        "开始执行任务"
    );
    binding.runner.execute(payload.as_ref(), &runner_ctx).await
}

/// 收尾：RUNNING → 终态的条件更新
///
/// 收尾失败只记录日志，循环继续下一次迭代；卡在RUNNING的任务由
/// 外部对账进程回收，不在本子系统职责内。
async fn finalize(ctx: &WorkerContext, slot: usize, task_id: i64, status: TaskStatus) {
    match ctx
        .task_repository
        .update_status_and_end_time(task_id, TaskStatus::Running, status, Utc::now())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(slot, task_id, status = %status, "收尾更新落空：任务已不处于RUNNING");
        }
        Err(e) => {
            error!(slot, task_id, status = %status, "收尾更新失败: {e}");
        }
    }
}
