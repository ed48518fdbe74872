//! 内存任务仓储
//!
//! 嵌入式部署和测试场景使用。所有条件更新在单把互斥锁下完成，
//! 进程内多worker的竞争裁决语义与数据库后端一致（但不持久）。

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_core::{SentinelResult, Task, TaskRepository, TaskStatus};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct InMemoryTaskRepository {
    tasks: Mutex<HashMap<i64, Task>>,
    next_id: AtomicI64,
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// 当前全部任务的快照（测试和状态巡检用）
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> SentinelResult<Task> {
        let mut task = task.clone();
        task.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().await.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: i64) -> SentinelResult<Option<Task>> {
        Ok(self.tasks.lock().await.get(&id).cloned())
    }

    async fn find_by_status_ordered_by_created(
        &self,
        status: TaskStatus,
        limit: Option<i64>,
    ) -> SentinelResult<Vec<Task>> {
        let tasks = self.tasks.lock().await;
        let mut matched: Vec<Task> = tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        // created_at 可能同一毫秒落多条，用id做稳定的第二排序键
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            matched.truncate(limit as usize);
        }
        Ok(matched)
    }

    async fn update_status_and_worker(
        &self,
        task_id: i64,
        expected: TaskStatus,
        new_status: TaskStatus,
        worker_id: &str,
    ) -> SentinelResult<bool> {
        let mut tasks = self.tasks.lock().await;
        match tasks.get_mut(&task_id) {
            Some(task) if task.status == expected => {
                task.status = new_status;
                task.worker_id = Some(worker_id.to_string());
                task.started_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_status_and_end_time(
        &self,
        task_id: i64,
        expected: TaskStatus,
        new_status: TaskStatus,
        ended_at: DateTime<Utc>,
    ) -> SentinelResult<bool> {
        let mut tasks = self.tasks.lock().await;
        match tasks.get_mut(&task_id) {
            Some(task) if task.status == expected => {
                task.status = new_status;
                task.ended_at = Some(ended_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
