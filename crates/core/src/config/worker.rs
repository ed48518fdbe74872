use serde::{Deserialize, Serialize};

/// 执行失败后的收尾策略
///
/// 历史实现无论执行成败一律把任务收尾为 COMPLETED；这里把该行为
/// 显式化为配置项，默认改为收尾 FAILED。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 收尾为 FAILED（默认）
    #[default]
    MarkFailed,
    /// 收尾为 COMPLETED（兼容旧行为）
    MarkCompleted,
    /// 保持 RUNNING，留给外部对账进程回收
    LeaveRunning,
}

/// Worker配置
///
/// `worker_id` 允许留空，启动阶段会回退为 `主机名-进程号`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub max_parallel_tasks: usize,
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub scan_limit: i64,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

impl WorkerConfig {
    /// 校验Worker配置
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_parallel_tasks == 0 {
            return Err(anyhow::anyhow!("worker池大小必须大于0"));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("任务轮询间隔必须大于0"));
        }

        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(anyhow::anyhow!("轮询退避上限不能小于初始轮询间隔"));
        }

        if self.scan_limit <= 0 {
            return Err(anyhow::anyhow!("单轮扫描数量必须大于0"));
        }

        Ok(())
    }
}
