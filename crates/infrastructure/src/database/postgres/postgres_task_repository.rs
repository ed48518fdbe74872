use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_core::{SentinelResult, Task, TaskRepository, TaskStatus};
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::database::map_db_err;

/// PostgreSQL任务仓储
///
/// 条件更新直接落在单条 `UPDATE ... WHERE id = $1 AND status = $2` 上，
/// 借助数据库对单行写入的原子性实现compare-and-swap，
/// 以 `rows_affected` 判定本次调用是否完成了迁移。
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化表结构
    pub async fn migrate(pool: &PgPool) -> SentinelResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id BIGSERIAL PRIMARY KEY,
                task_type VARCHAR(64) NOT NULL,
                payload JSONB NOT NULL DEFAULT '{}',
                status VARCHAR(16) NOT NULL DEFAULT 'WAITING',
                worker_id VARCHAR(128),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                started_at TIMESTAMPTZ,
                ended_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(map_db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_tasks_status_created_at
             ON tasks (status, created_at)",
        )
        .execute(pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    fn row_to_task(row: &sqlx::postgres::PgRow) -> SentinelResult<Task> {
        Ok(Task {
            id: row.try_get("id")?,
            task_type: row.try_get("task_type")?,
            payload: row.try_get("payload")?,
            status: row.try_get("status")?,
            worker_id: row.try_get("worker_id")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
        })
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn create(&self, task: &Task) -> SentinelResult<Task> {
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (task_type, payload, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_type, payload, status, worker_id, created_at, started_at, ended_at
            "#,
        )
        .bind(&task.task_type)
        .bind(&task.payload)
        .bind(task.status)
        .bind(task.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let created = Self::row_to_task(&row)?;
        debug!("创建任务成功: id={}, type={}", created.id, created.task_type);
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> SentinelResult<Option<Task>> {
        let row = sqlx::query(
            "SELECT id, task_type, payload, status, worker_id, created_at, started_at, ended_at
             FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_status_ordered_by_created(
        &self,
        status: TaskStatus,
        limit: Option<i64>,
    ) -> SentinelResult<Vec<Task>> {
        let rows = match limit {
            Some(limit) => {
                sqlx::query(
                    "SELECT id, task_type, payload, status, worker_id, created_at, started_at, ended_at
                     FROM tasks WHERE status = $1 ORDER BY created_at ASC, id ASC LIMIT $2",
                )
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, task_type, payload, status, worker_id, created_at, started_at, ended_at
                     FROM tasks WHERE status = $1 ORDER BY created_at ASC, id ASC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_err)?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn update_status_and_worker(
        &self,
        task_id: i64,
        expected: TaskStatus,
        new_status: TaskStatus,
        worker_id: &str,
    ) -> SentinelResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET status = $3, worker_id = $4, started_at = NOW()
             WHERE id = $1 AND status = $2",
        )
        .bind(task_id)
        .bind(expected)
        .bind(new_status)
        .bind(worker_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_status_and_end_time(
        &self,
        task_id: i64,
        expected: TaskStatus,
        new_status: TaskStatus,
        ended_at: DateTime<Utc>,
    ) -> SentinelResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET status = $3, ended_at = $4
             WHERE id = $1 AND status = $2",
        )
        .bind(task_id)
        .bind(expected)
        .bind(new_status)
        .bind(ended_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() == 1)
    }
}
