//! 任务存储层接口定义
//!
//! 调度核心对持久化层的全部诉求收敛在 [`TaskRepository`] 上：
//! 按状态扫描（创建时间升序）加上两条带前置条件的状态更新。
//!
//! ## 设计原则
//!
//! ### 条件更新是唯一的同步原语
//! 多个进程内的多个worker同时竞争同一行任务时，胜负由存储层对
//! 单行的原子比较写入裁决，客户端在扫描和更新之间不持有任何锁。
//! 实现必须保证条件更新对单行是原子且线性一致的
//! （对 `status` 列的 compare-and-swap 语义）。
//!
//! ### 禁止无条件状态写入
//! 本子系统内对 `status` 列的任何写入都必须携带期望前值。
//! 竞争失败（返回 `false`）是预期内的正常路径，不是错误。
//!
//! ### 冲突即重试
//! 实现应把存储层的版本/行冲突映射为
//! [`SentinelError::StoreConflict`](crate::SentinelError::StoreConflict)，
//! 调用方据此把该轮扫描当作"没有任务"处理。
//!
//! ## 使用示例
//!
//! ```ignore
//! // 抢占：第一个条件更新成功的worker获得任务
//! let claimed = repo
//!     .update_status_and_worker(task.id, TaskStatus::Waiting, TaskStatus::Running, "worker-1")
//!     .await?;
//! if claimed {
//!     // 任务归我，执行它
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Task, TaskStatus};
use crate::SentinelResult;

/// 任务仓储接口
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 插入一条新任务，返回带存储层分配id的完整记录
    ///
    /// 提交方接口：调度核心本身从不创建任务，此方法供宿主进程、
    /// 测试和演示代码使用。
    async fn create(&self, task: &Task) -> SentinelResult<Task>;

    /// 按id查询
    async fn find_by_id(&self, id: i64) -> SentinelResult<Option<Task>>;

    /// 按状态查询，按 `created_at` 升序返回（最老优先）
    ///
    /// `limit` 限制单轮扫描量，worker以此作为每轮抢占的候选预算。
    async fn find_by_status_ordered_by_created(
        &self,
        status: TaskStatus,
        limit: Option<i64>,
    ) -> SentinelResult<Vec<Task>>;

    /// 抢占用条件更新
    ///
    /// 当且仅当该行当前状态等于 `expected` 时，把状态置为
    /// `new_status`、写入 `worker_id` 并盖上 `started_at`。
    /// 返回 `true` 表示本次调用完成了迁移，`false` 表示输给了竞争者。
    async fn update_status_and_worker(
        &self,
        task_id: i64,
        expected: TaskStatus,
        new_status: TaskStatus,
        worker_id: &str,
    ) -> SentinelResult<bool>;

    /// 收尾用条件更新
    ///
    /// 前置条件语义同上，写入终态和 `ended_at`。
    async fn update_status_and_end_time(
        &self,
        task_id: i64,
        expected: TaskStatus,
        new_status: TaskStatus,
        ended_at: DateTime<Utc>,
    ) -> SentinelResult<bool>;
}
