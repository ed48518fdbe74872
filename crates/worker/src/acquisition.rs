//! 任务抢占协议
//!
//! 扫描 WAITING 任务（创建时间最老优先），逐条尝试条件更新，第一条
//! 成功的归本worker所有；整轮落空则退避后重扫。扫描与更新之间不持
//! 任何锁，竞争输掉是常态，胜负由存储层的原子条件写裁决。
//!
//! 最老优先只是尽力而为的公平策略：竞争激烈时老任务的条件更新可能
//! 落败而让更年轻的任务先被抢走，这是协议允许的。

use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use sentinel_core::{Task, TaskStatus};

use crate::context::WorkerContext;

/// 单轮扫描加抢占的结果
enum Round {
    /// 抢到了
    Claimed(Task),
    /// 有候选但全部输给了竞争者
    Lost,
    /// 没有候选（含扫描冲突按空轮处理的情况）
    Empty,
}

/// 单个worker槽位的任务抢占器
pub struct TaskAcquirer<'a> {
    ctx: &'a WorkerContext,
    slot: usize,
}

impl<'a> TaskAcquirer<'a> {
    pub fn new(ctx: &'a WorkerContext, slot: usize) -> Self {
        Self { ctx, slot }
    }

    /// 抢占一条任务
    ///
    /// 阻塞式轮询，仅在观察到关闭信号时返回 `None`。返回的任务一定
    /// 已由本worker通过条件更新迁移到 RUNNING。
    ///
    /// 每轮的候选量被 `scan_limit` 限制，轮与轮之间重查关闭信号，
    /// 退避休眠同时监听关闭，保证高竞争下也能及时响应停机。
    pub async fn acquire_one(&self, shutdown_rx: &mut watch::Receiver<bool>) -> Option<Task> {
        let mut backoff_ms = self.ctx.config.poll_interval_ms;

        loop {
            if *shutdown_rx.borrow() {
                return None;
            }

            match self.scan_and_claim().await {
                Round::Claimed(task) => return Some(task),
                Round::Lost => {
                    // 输掉整轮竞争说明队列刚被别人动过，立即重扫；
                    // 候选都已离开WAITING时下一轮自然进入空轮退避
                    backoff_ms = self.ctx.config.poll_interval_ms;
                    continue;
                }
                Round::Empty => {}
            }

            let sleep_ms = jitter(backoff_ms);
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        // 发送端消失等价于关闭
                        return None;
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
            }

            backoff_ms = (backoff_ms * 2).min(self.ctx.config.max_poll_interval_ms);
        }
    }

    /// 扫描一轮并尝试抢占
    async fn scan_and_claim(&self) -> Round {
        let repo = &self.ctx.task_repository;

        let candidates = match repo
            .find_by_status_ordered_by_created(
                TaskStatus::Waiting,
                Some(self.ctx.config.scan_limit),
            )
            .await
        {
            Ok(candidates) => candidates,
            Err(e) if e.is_conflict() => {
                // 扫描撞上存储层并发冲突：按"本轮没有任务"处理
                warn!(slot = self.slot, "扫描遇到并发冲突，本轮跳过: {e}");
                return Round::Empty;
            }
            Err(e) => {
                warn!(slot = self.slot, "扫描任务失败，稍后重试: {e}");
                return Round::Empty;
            }
        };

        if candidates.is_empty() {
            return Round::Empty;
        }
        debug!(slot = self.slot, count = candidates.len(), "发现等待中的任务");

        for mut task in candidates {
            let claimed = match repo
                .update_status_and_worker(
                    task.id,
                    TaskStatus::Waiting,
                    TaskStatus::Running,
                    &self.ctx.worker_id,
                )
                .await
            {
                Ok(claimed) => claimed,
                Err(e) if e.is_conflict() => {
                    debug!(slot = self.slot, task_id = task.id, "抢占遇到并发冲突: {e}");
                    false
                }
                Err(e) => {
                    warn!(slot = self.slot, task_id = task.id, "抢占更新失败: {e}");
                    false
                }
            };

            if claimed {
                info!(slot = self.slot, task_id = task.id, "任务抢占成功");
                // 本地副本补上条件更新写入的字段
                task.status = TaskStatus::Running;
                task.worker_id = Some(self.ctx.worker_id.clone());
                task.started_at = Some(chrono::Utc::now());
                return Round::Claimed(task);
            }
            debug!(slot = self.slot, task_id = task.id, "任务已被其他worker抢走");
        }

        Round::Lost
    }
}

/// 给退避间隔加抖动，错开多worker的扫描节奏
fn jitter(base_ms: u64) -> u64 {
    let spread = (base_ms / 5).max(1);
    let mut rng = rand::rng();
    base_ms.saturating_sub(spread / 2) + rng.random_range(0..spread)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_near_base() {
        for _ in 0..100 {
            let v = jitter(1000);
            assert!((900..1200).contains(&v), "jitter出界: {v}");
        }
    }

    #[test]
    fn jitter_handles_tiny_base() {
        for _ in 0..100 {
            assert!(jitter(1) <= 2);
        }
    }
}
