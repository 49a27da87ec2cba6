use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use streamfleet_core::{
    models::{JobStatus, StreamJob},
    traits::JobRepository,
    FleetError, FleetResult,
};

const JOB_COLUMNS: &str =
    "id, stream_key, status, vps_node_id, error_message, created_at, updated_at";

/// PostgreSQL推流任务仓储实现
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    /// 创建新的PostgreSQL任务仓储
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 将数据库行转换为StreamJob模型
    fn row_to_job(row: &sqlx::postgres::PgRow) -> FleetResult<StreamJob> {
        Ok(StreamJob {
            id: row.try_get("id")?,
            stream_key: row.try_get("stream_key")?,
            status: row.try_get("status")?,
            vps_node_id: row.try_get("vps_node_id")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    /// 创建任务
    async fn create(&self, job: &StreamJob) -> FleetResult<StreamJob> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO stream_jobs (stream_key, status, vps_node_id, error_message, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {JOB_COLUMNS}
            "#,
        ))
        .bind(&job.stream_key)
        .bind(job.status)
        .bind(job.vps_node_id)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        let created = Self::row_to_job(&row)?;
        debug!("创建推流任务成功: {}", created.id);
        Ok(created)
    }

    /// 根据ID获取任务
    async fn get_by_id(&self, job_id: i64) -> FleetResult<Option<StreamJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM stream_jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    /// 获取指定节点上处于给定状态集合中的任务
    async fn get_jobs_on_node(
        &self,
        node_id: i64,
        statuses: &[JobStatus],
    ) -> FleetResult<Vec<StreamJob>> {
        let status_names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM stream_jobs WHERE vps_node_id = $1 AND status = ANY($2) ORDER BY id"
        ))
        .bind(node_id)
        .bind(&status_names)
        .fetch_all(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        rows.iter().map(Self::row_to_job).collect()
    }

    /// 更新任务状态与错误信息
    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> FleetResult<()> {
        let result = sqlx::query(
            "UPDATE stream_jobs SET status = $1, error_message = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(status)
        .bind(error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::JobNotFound { id: job_id });
        }

        debug!("更新任务状态成功: {} -> {:?}", job_id, status);
        Ok(())
    }

    /// 将任务与所在节点解绑
    async fn detach_from_node(&self, job_id: i64) -> FleetResult<()> {
        let result = sqlx::query(
            "UPDATE stream_jobs SET vps_node_id = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::JobNotFound { id: job_id });
        }

        debug!("任务 {} 已与节点解绑", job_id);
        Ok(())
    }
}
