use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use sentinel_core::{
    FailurePolicy, RunnerContext, RunnerRegistry, SentinelResult, Task, TaskPayload,
    TaskRepository, TaskResult, TaskRunner, TaskStatus, WorkerConfig,
};
use sentinel_infrastructure::InMemoryTaskRepository;
use sentinel_worker::{TaskDriver, WorkerContext};
use serde::Deserialize;
use serde_json::json;
use tokio::time::timeout;

#[derive(Debug, Deserialize)]
struct NoopPayload {}

impl TaskPayload for NoopPayload {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// 记录每次执行的task_id，校验"恰好执行一次"
struct RecordingRunner {
    executed: Arc<StdMutex<Vec<i64>>>,
}

#[async_trait]
impl TaskRunner for RecordingRunner {
    fn name(&self) -> &str {
        "recording"
    }

    async fn execute(
        &self,
        _payload: &dyn TaskPayload,
        ctx: &RunnerContext,
    ) -> SentinelResult<Vec<TaskResult>> {
        self.executed.lock().unwrap().push(ctx.task_id);
        Ok(Vec::new())
    }
}

/// 执行耗时固定的执行器，用于验证停机等待在途任务
struct SlowRunner {
    delay: Duration,
    executions: Arc<AtomicUsize>,
}

#[async_trait]
impl TaskRunner for SlowRunner {
    fn name(&self) -> &str {
        "slow"
    }

    async fn execute(
        &self,
        _payload: &dyn TaskPayload,
        _ctx: &RunnerContext,
    ) -> SentinelResult<Vec<TaskResult>> {
        tokio::time::sleep(self.delay).await;
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn test_config(worker_id: &str, pool_size: usize) -> WorkerConfig {
    WorkerConfig {
        worker_id: worker_id.to_string(),
        max_parallel_tasks: pool_size,
        poll_interval_ms: 10,
        max_poll_interval_ms: 40,
        scan_limit: 10,
        on_failure: FailurePolicy::MarkFailed,
    }
}

fn recording_ctx(
    repo: &Arc<InMemoryTaskRepository>,
    executed: &Arc<StdMutex<Vec<i64>>>,
    worker_id: &str,
    pool_size: usize,
) -> Arc<WorkerContext> {
    let mut registry = RunnerRegistry::new();
    registry
        .register_json::<NoopPayload>(
            "record",
            Arc::new(RecordingRunner {
                executed: Arc::clone(executed),
            }),
        )
        .unwrap();
    Arc::new(WorkerContext::new(
        worker_id,
        repo.clone(),
        Arc::new(registry),
        test_config(worker_id, pool_size),
    ))
}

async fn wait_until_no_pending(repo: &Arc<InMemoryTaskRepository>) {
    timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = repo.snapshot().await;
            if snapshot.iter().all(|t| t.is_terminal()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("等待任务全部进入终态超时");
}

#[tokio::test]
async fn pool_processes_backlog_exactly_once() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    for i in 0..10 {
        repo.create(&Task::new("record", json!({ "seq": i })))
            .await
            .unwrap();
    }

    let executed = Arc::new(StdMutex::new(Vec::new()));
    let driver = TaskDriver::new(recording_ctx(&repo, &executed, "worker-a", 3));

    driver.start().await.unwrap();
    assert!(driver.is_running().await);

    wait_until_no_pending(&repo).await;
    driver.stop().await.unwrap();
    assert!(!driver.is_running().await);

    let ids = executed.lock().unwrap().clone();
    assert_eq!(ids.len(), 10, "每条任务恰好执行一次");
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 10, "不允许重复执行");

    for task in repo.snapshot().await {
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.worker_id.as_deref(), Some("worker-a"));
        assert!(task.ended_at.is_some());
    }
}

#[tokio::test]
async fn stop_waits_for_inflight_execution() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let mut registry = RunnerRegistry::new();
    registry
        .register_json::<NoopPayload>(
            "slow",
            Arc::new(SlowRunner {
                delay: Duration::from_millis(300),
                executions: Arc::clone(&executions),
            }),
        )
        .unwrap();
    let ctx = Arc::new(WorkerContext::new(
        "worker-a",
        repo.clone(),
        Arc::new(registry),
        test_config("worker-a", 1),
    ));

    let driver = TaskDriver::new(ctx);
    driver.start().await.unwrap();

    let task = repo.create(&Task::new("slow", json!({}))).await.unwrap();

    // 等任务被抢到、进入执行
    timeout(Duration::from_secs(2), async {
        loop {
            let stored = repo.find_by_id(task.id).await.unwrap().unwrap();
            if stored.status == TaskStatus::Running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("任务未进入RUNNING");

    // 执行中途请求停机：stop必须等在途任务执行并收尾后才返回
    driver.stop().await.unwrap();

    let stored = repo.find_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed, "在途任务不得被丢弃");
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_acquisition_after_stop() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let executed = Arc::new(StdMutex::new(Vec::new()));
    let driver = TaskDriver::new(recording_ctx(&repo, &executed, "worker-a", 2));

    driver.start().await.unwrap();
    driver.stop().await.unwrap();

    let task = repo.create(&Task::new("record", json!({}))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let stored = repo.find_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Waiting, "停机后不得再抢占新任务");
    assert!(executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn double_start_is_rejected() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let executed = Arc::new(StdMutex::new(Vec::new()));
    let driver = TaskDriver::new(recording_ctx(&repo, &executed, "worker-a", 1));

    driver.start().await.unwrap();
    assert!(driver.start().await.is_err());
    driver.stop().await.unwrap();

    // 停机后允许再次启动
    driver.start().await.unwrap();
    driver.stop().await.unwrap();
}

#[tokio::test]
async fn fleet_of_two_processes_shares_the_queue_safely() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    for i in 0..20 {
        repo.create(&Task::new("record", json!({ "seq": i })))
            .await
            .unwrap();
    }

    // 两个驱动器模拟两个独立worker进程，共享同一个存储
    let executed = Arc::new(StdMutex::new(Vec::new()));
    let driver_a = TaskDriver::new(recording_ctx(&repo, &executed, "worker-a", 2));
    let driver_b = TaskDriver::new(recording_ctx(&repo, &executed, "worker-b", 2));

    driver_a.start().await.unwrap();
    driver_b.start().await.unwrap();

    wait_until_no_pending(&repo).await;
    driver_a.stop().await.unwrap();
    driver_b.stop().await.unwrap();

    let ids = executed.lock().unwrap().clone();
    assert_eq!(ids.len(), 20, "全队成功抢占数不得超过任务数");
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 20, "每条任务在整个fleet内恰好执行一次");

    for task in repo.snapshot().await {
        assert_eq!(task.status, TaskStatus::Completed);
        let owner = task.worker_id.as_deref().unwrap();
        assert!(owner == "worker-a" || owner == "worker-b");
    }
}
