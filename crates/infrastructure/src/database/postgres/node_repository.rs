use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;

use streamfleet_core::{
    models::{NodeStatus, ResourceSample, VpsNode},
    traits::NodeRepository,
    FleetError, FleetResult,
};

const NODE_COLUMNS: &str = "id, name, ip_address, status, current_streams, last_heartbeat_at, \
     cpu_percent, ram_percent, disk_percent, available_capacity, resources_sampled_at, registered_at";

/// PostgreSQL VPS节点仓储实现
pub struct PostgresNodeRepository {
    pool: PgPool,
}

impl PostgresNodeRepository {
    /// 创建新的PostgreSQL节点仓储
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 将数据库行转换为VpsNode模型
    fn row_to_node(row: &sqlx::postgres::PgRow) -> FleetResult<VpsNode> {
        // 资源采样以采样时间是否存在为准
        let sampled_at: Option<DateTime<Utc>> = row.try_get("resources_sampled_at")?;
        let resources = match sampled_at {
            Some(sampled_at) => Some(ResourceSample {
                cpu_percent: row.try_get("cpu_percent")?,
                ram_percent: row.try_get("ram_percent")?,
                disk_percent: row.try_get("disk_percent")?,
                available_capacity: row.try_get("available_capacity")?,
                sampled_at,
            }),
            None => None,
        };

        Ok(VpsNode {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            ip_address: row.try_get("ip_address")?,
            status: row.try_get("status")?,
            current_streams: row.try_get("current_streams")?,
            last_heartbeat_at: row.try_get("last_heartbeat_at")?,
            resources,
            registered_at: row.try_get("registered_at")?,
        })
    }
}

#[async_trait]
impl NodeRepository for PostgresNodeRepository {
    /// 注册新节点
    async fn register(&self, node: &VpsNode) -> FleetResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vps_nodes (id, name, ip_address, status, current_streams, last_heartbeat_at, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                ip_address = EXCLUDED.ip_address,
                status = EXCLUDED.status,
                last_heartbeat_at = EXCLUDED.last_heartbeat_at
            "#,
        )
        .bind(node.id)
        .bind(&node.name)
        .bind(&node.ip_address)
        .bind(node.status)
        .bind(node.current_streams)
        .bind(node.last_heartbeat_at)
        .bind(node.registered_at)
        .execute(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        debug!("注册节点成功: {}", node.id);
        Ok(())
    }

    /// 根据ID获取节点
    async fn get_by_id(&self, node_id: i64) -> FleetResult<Option<VpsNode>> {
        let row = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM vps_nodes WHERE id = $1"
        ))
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    /// 获取全部节点列表
    async fn list(&self) -> FleetResult<Vec<VpsNode>> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM vps_nodes ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        rows.iter().map(Self::row_to_node).collect()
    }

    /// 按状态获取节点列表，按ID排序保证池顺序稳定
    async fn list_by_status(&self, status: NodeStatus) -> FleetResult<Vec<VpsNode>> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM vps_nodes WHERE status = $1 ORDER BY id"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        rows.iter().map(Self::row_to_node).collect()
    }

    /// 更新节点状态
    async fn update_status(&self, node_id: i64, status: NodeStatus) -> FleetResult<()> {
        let result = sqlx::query("UPDATE vps_nodes SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(node_id)
            .execute(&self.pool)
            .await
            .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::NodeNotFound { id: node_id });
        }

        debug!("更新节点状态成功: {} -> {:?}", node_id, status);
        Ok(())
    }

    /// 刷新节点心跳
    async fn update_heartbeat(
        &self,
        node_id: i64,
        heartbeat_time: DateTime<Utc>,
    ) -> FleetResult<()> {
        let result = sqlx::query("UPDATE vps_nodes SET last_heartbeat_at = $1 WHERE id = $2")
            .bind(heartbeat_time)
            .bind(node_id)
            .execute(&self.pool)
            .await
            .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::NodeNotFound { id: node_id });
        }

        debug!("刷新节点心跳成功: {}", node_id);
        Ok(())
    }

    /// 更新节点资源采样
    async fn update_resources(&self, node_id: i64, sample: &ResourceSample) -> FleetResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE vps_nodes
            SET cpu_percent = $1, ram_percent = $2, disk_percent = $3,
                available_capacity = $4, resources_sampled_at = $5
            WHERE id = $6
            "#,
        )
        .bind(sample.cpu_percent)
        .bind(sample.ram_percent)
        .bind(sample.disk_percent)
        .bind(sample.available_capacity)
        .bind(sample.sampled_at)
        .bind(node_id)
        .execute(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::NodeNotFound { id: node_id });
        }

        debug!("更新节点资源采样成功: {}", node_id);
        Ok(())
    }

    /// 原子增加节点当前推流计数
    async fn increment_stream_count(&self, node_id: i64) -> FleetResult<()> {
        let result =
            sqlx::query("UPDATE vps_nodes SET current_streams = current_streams + 1 WHERE id = $1")
                .bind(node_id)
                .execute(&self.pool)
                .await
                .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::NodeNotFound { id: node_id });
        }

        debug!("节点 {} 推流计数+1", node_id);
        Ok(())
    }

    /// 原子减少节点当前推流计数，不会低于0
    async fn decrement_stream_count(&self, node_id: i64) -> FleetResult<()> {
        let result = sqlx::query(
            "UPDATE vps_nodes SET current_streams = GREATEST(current_streams - 1, 0) WHERE id = $1",
        )
        .bind(node_id)
        .execute(&self.pool)
        .await
        .map_err(FleetError::Database)?;

        if result.rows_affected() == 0 {
            return Err(FleetError::NodeNotFound { id: node_id });
        }

        debug!("节点 {} 推流计数-1", node_id);
        Ok(())
    }
}
