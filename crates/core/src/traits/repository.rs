use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{JobStatus, NodeStatus, ResourceSample, StreamJob, VpsNode};
use crate::FleetResult;

/// VPS节点仓储接口
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// 注册新节点，已存在时更新基本信息
    async fn register(&self, node: &VpsNode) -> FleetResult<()>;

    /// 根据ID获取节点
    async fn get_by_id(&self, node_id: i64) -> FleetResult<Option<VpsNode>>;

    /// 获取全部节点列表
    async fn list(&self) -> FleetResult<Vec<VpsNode>>;

    /// 按状态获取节点列表，按节点ID排序以保证分配时的池顺序稳定
    async fn list_by_status(&self, status: NodeStatus) -> FleetResult<Vec<VpsNode>>;

    /// 更新节点状态
    async fn update_status(&self, node_id: i64, status: NodeStatus) -> FleetResult<()>;

    /// 刷新节点心跳时间
    async fn update_heartbeat(
        &self,
        node_id: i64,
        heartbeat_time: DateTime<Utc>,
    ) -> FleetResult<()>;

    /// 更新节点资源采样
    async fn update_resources(&self, node_id: i64, sample: &ResourceSample) -> FleetResult<()>;

    /// 原子增加节点当前推流计数
    async fn increment_stream_count(&self, node_id: i64) -> FleetResult<()>;

    /// 原子减少节点当前推流计数，不会低于0
    async fn decrement_stream_count(&self, node_id: i64) -> FleetResult<()>;
}

/// 推流任务仓储接口
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 创建任务，返回带ID的任务
    async fn create(&self, job: &StreamJob) -> FleetResult<StreamJob>;

    /// 根据ID获取任务
    async fn get_by_id(&self, job_id: i64) -> FleetResult<Option<StreamJob>>;

    /// 获取指定节点上处于给定状态集合中的任务，按任务ID排序
    async fn get_jobs_on_node(
        &self,
        node_id: i64,
        statuses: &[JobStatus],
    ) -> FleetResult<Vec<StreamJob>>;

    /// 更新任务状态与错误信息（error_message为None时清空）
    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> FleetResult<()>;

    /// 将任务与所在节点解绑
    async fn detach_from_node(&self, job_id: i64) -> FleetResult<()>;
}
