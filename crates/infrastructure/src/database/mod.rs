//! 数据库接入层
//!
//! 连接池建立、表结构初始化和仓储装配的统一入口。

pub mod postgres;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use sentinel_core::{DatabaseConfig, SentinelError, SentinelResult, TaskRepository};

use self::postgres::PostgresTaskRepository;
use self::sqlite::SqliteTaskRepository;

/// 数据库类型识别
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::PostgreSQL
        } else {
            DatabaseType::SQLite
        }
    }
}

/// 数据库连接池
pub enum DatabasePool {
    PostgreSQL(sqlx::PgPool),
    SQLite(sqlx::SqlitePool),
}

impl DatabasePool {
    /// 按URL自动识别类型并建立连接池
    pub async fn connect(config: &DatabaseConfig) -> SentinelResult<Self> {
        match DatabaseType::from_url(&config.url) {
            DatabaseType::PostgreSQL => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .min_connections(config.min_connections)
                    .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
                    .connect(&config.url)
                    .await
                    .map_err(SentinelError::Database)?;
                Ok(DatabasePool::PostgreSQL(pool))
            }
            DatabaseType::SQLite => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
                    .connect(&config.url)
                    .await
                    .map_err(SentinelError::Database)?;
                Ok(DatabasePool::SQLite(pool))
            }
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        match self {
            DatabasePool::PostgreSQL(_) => DatabaseType::PostgreSQL,
            DatabasePool::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// 初始化任务表结构（宿主进程启动时调用一次）
    pub async fn migrate(&self) -> SentinelResult<()> {
        match self {
            DatabasePool::PostgreSQL(pool) => PostgresTaskRepository::migrate(pool).await,
            DatabasePool::SQLite(pool) => SqliteTaskRepository::migrate(pool).await,
        }
    }

    /// 装配任务仓储
    pub fn task_repository(&self) -> Arc<dyn TaskRepository> {
        match self {
            DatabasePool::PostgreSQL(pool) => Arc::new(PostgresTaskRepository::new(pool.clone())),
            DatabasePool::SQLite(pool) => Arc::new(SqliteTaskRepository::new(pool.clone())),
        }
    }

    /// 连接健康检查
    pub async fn health_check(&self) -> SentinelResult<()> {
        match self {
            DatabasePool::PostgreSQL(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(SentinelError::Database)?;
            }
            DatabasePool::SQLite(pool) => {
                sqlx::query("SELECT 1")
                    .execute(pool)
                    .await
                    .map_err(SentinelError::Database)?;
            }
        }
        Ok(())
    }
}

/// 底层数据库错误归类
///
/// 串行化失败、死锁和SQLite的BUSY/LOCKED属于并发冲突，
/// 映射为 `StoreConflict`，调用方按"本轮无结果"重试。
pub(crate) fn map_db_err(e: sqlx::Error) -> SentinelError {
    let conflict = matches!(
        &e,
        sqlx::Error::Database(db) if matches!(
            db.code().as_deref(),
            Some("40001") | Some("40P01") | Some("5") | Some("6")
        )
    );
    if conflict {
        SentinelError::StoreConflict(e.to_string())
    } else {
        SentinelError::Database(e)
    }
}
