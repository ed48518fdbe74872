use std::sync::Arc;

use sentinel_core::{RunnerRegistry, TaskRepository, WorkerConfig};

/// 进程内所有worker循环共享的只读执行上下文
///
/// 驱动器构造时创建一次，启动后不再变更；成员都要求并发只读安全。
pub struct WorkerContext {
    /// 本进程的worker标识，抢占时写入任务行
    pub worker_id: String,
    /// 任务仓储
    pub task_repository: Arc<dyn TaskRepository>,
    /// 执行器注册表
    pub registry: Arc<RunnerRegistry>,
    /// Worker配置
    pub config: WorkerConfig,
}

impl WorkerContext {
    pub fn new(
        worker_id: impl Into<String>,
        task_repository: Arc<dyn TaskRepository>,
        registry: Arc<RunnerRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_repository,
            registry,
            config,
        }
    }
}
