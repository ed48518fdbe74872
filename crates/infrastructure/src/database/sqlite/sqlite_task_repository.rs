use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_core::{SentinelError, SentinelResult, Task, TaskRepository, TaskStatus};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::database::map_db_err;

/// SQLite任务仓储
///
/// 嵌入式部署场景使用。载荷以TEXT存储JSON串；条件更新与
/// PostgreSQL实现同构，SQLite对单条UPDATE同样是原子的。
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 初始化表结构
    pub async fn migrate(pool: &SqlitePool) -> SentinelResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_type TEXT NOT NULL,
                payload TEXT NOT NULL DEFAULT '{}',
                status TEXT NOT NULL DEFAULT 'WAITING',
                worker_id TEXT,
                created_at TIMESTAMP NOT NULL,
                started_at TIMESTAMP,
                ended_at TIMESTAMP
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

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> SentinelResult<Task> {
        let payload_text: String = row.try_get("payload")?;
        let payload = serde_json::from_str(&payload_text)
            .map_err(|e| SentinelError::PayloadDecode(format!("载荷不是合法JSON: {e}")))?;

        Ok(Task {
            id: row.try_get("id")?,
            task_type: row.try_get("task_type")?,
            payload,
            status: row.try_get("status")?,
            worker_id: row.try_get("worker_id")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
        })
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> SentinelResult<Task> {
        let payload_json = serde_json::to_string(&task.payload)
            .map_err(|e| SentinelError::PayloadDecode(e.to_string()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO tasks (task_type, payload, status, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_type, payload, status, worker_id, created_at, started_at, ended_at
            "#,
        )
        .bind(&task.task_type)
        .bind(payload_json)
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
            "UPDATE tasks SET status = $3, worker_id = $4, started_at = $5
             WHERE id = $1 AND status = $2",
        )
        .bind(task_id)
        .bind(expected)
        .bind(new_status)
        .bind(worker_id)
        .bind(Utc::now())
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
