use thiserror::Error;

/// 任务引擎错误类型定义
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("存储乐观并发冲突: {0}")]
    StoreConflict(String),

    #[error("任务未找到: {id}")]
    TaskNotFound { id: i64 },

    #[error("未注册的任务类型: {task_type}")]
    UnknownTaskType { task_type: String },

    #[error("任务类型 '{task_type}' 已注册过执行器")]
    DuplicateRunner { task_type: String },

    #[error("任务载荷解码失败: {0}")]
    PayloadDecode(String),

    #[error("任务执行错误: {0}")]
    TaskExecution(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SentinelError {
    /// 判断是否为存储层的并发冲突
    ///
    /// 抢占协议在扫描或条件更新时遇到这类错误，按"本轮没有可用任务"
    /// 处理后重试，绝不向上传播为致命错误。
    /// 覆盖 PostgreSQL 的串行化失败/死锁（40001/40P01）和
    /// SQLite 的 BUSY/LOCKED（5/6）。
    pub fn is_conflict(&self) -> bool {
        match self {
            SentinelError::StoreConflict(_) => true,
            SentinelError::Database(sqlx::Error::Database(db)) => matches!(
                db.code().as_deref(),
                Some("40001") | Some("40P01") | Some("5") | Some("6")
            ),
            _ => false,
        }
    }
}

/// 统一的Result类型
pub type SentinelResult<T> = std::result::Result<T, SentinelError>;
