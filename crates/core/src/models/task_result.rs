use serde::{Deserialize, Serialize};

/// 任务执行产物
///
/// 一次执行可以产出零条或多条结果（例如阈值检测对每个越界的时间桶
/// 产出一条）。调度核心只把结果交还给worker循环并记录数量，
/// 持久化与否由执行器自己的业务逻辑决定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: i64,
    pub output: serde_json::Value,
    pub message: Option<String>,
}

impl TaskResult {
    pub fn new(task_id: i64, output: serde_json::Value) -> Self {
        Self {
            task_id,
            output,
            message: None,
        }
    }

    pub fn with_message(
        task_id: i64,
        output: serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            output,
            message: Some(message.into()),
        }
    }
}
