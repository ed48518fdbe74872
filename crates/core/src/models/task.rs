use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 任务记录
///
/// 共享队列中的一个工作单元。由外部提交方以 `WAITING` 状态写入；
/// 调度核心只对它做两次状态变更：抢占（WAITING → RUNNING）和
/// 收尾（RUNNING → COMPLETED/FAILED），从不删除。
///
/// # 字段说明
///
/// - `id`: 存储层分配的唯一标识
/// - `task_type`: 任务类型标签，用于选择解码器和执行器
/// - `payload`: 不透明的序列化载荷，只有对应的解码器能解释
/// - `status`: 生命周期状态（见 [`TaskStatus`]）
/// - `worker_id`: 抢占该任务的worker标识，抢占时写入
/// - `created_at`: 创建时间，插入后不可变，抢占时按它升序排序（最老优先）
/// - `started_at`: 抢占成功时写入
/// - `ended_at`: 仅在进入终态时写入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub status: TaskStatus,
    pub worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Task {
    /// 创建一条待插入的任务记录
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: 0, // 将由数据库生成
            task_type: task_type.into(),
            payload,
            status: TaskStatus::Waiting,
            worker_id: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 任务生命周期状态
///
/// 状态机：`WAITING → RUNNING → COMPLETED | FAILED`。
/// 进入终态后本子系统不再写入该行（重试/重入队是外部职责）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// 状态机合法迁移检查
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (*self, next),
            (TaskStatus::Waiting, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "WAITING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for TaskStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for TaskStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Self::parse(s)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Self::parse(s)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl TaskStatus {
    fn parse(s: &str) -> Result<Self, sqlx::error::BoxDynError> {
        match s {
            "WAITING" => Ok(TaskStatus::Waiting),
            "RUNNING" => Ok(TaskStatus::Running),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            _ => Err(format!("Invalid task status: {s}").into()),
        }
    }
}
