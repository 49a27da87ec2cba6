use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// VPS节点信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpsNode {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub status: NodeStatus,
    /// 节点当前承载的推流任务数量
    pub current_streams: i32,
    /// 最后一次心跳时间，节点从未上报心跳时为空
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// 最近一次资源采样，新注册的节点可能尚无采样
    pub resources: Option<ResourceSample>,
    pub registered_at: DateTime<Utc>,
}

/// 节点状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum NodeStatus {
    /// 正常服务中
    #[serde(rename = "ACTIVE")]
    Active,
    /// 心跳超时，疑似网络分区或宕机
    #[serde(rename = "PARTITIONED")]
    Partitioned,
    /// 管理员下线，不参与调度
    #[serde(rename = "INACTIVE")]
    Inactive,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "ACTIVE",
            NodeStatus::Partitioned => "PARTITIONED",
            NodeStatus::Inactive => "INACTIVE",
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for NodeStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for NodeStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "ACTIVE" => Ok(NodeStatus::Active),
            "PARTITIONED" => Ok(NodeStatus::Partitioned),
            "INACTIVE" => Ok(NodeStatus::Inactive),
            _ => Err(format!("Invalid node status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for NodeStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// 节点资源采样
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
    /// 节点自行上报的剩余可用容量信号，上报时优先于阈值推断
    pub available_capacity: Option<f64>,
    pub sampled_at: DateTime<Utc>,
}

impl VpsNode {
    /// 检查节点是否处于正常服务状态
    pub fn is_active(&self) -> bool {
        matches!(self.status, NodeStatus::Active)
    }

    /// 距离最后一次心跳的时长，从未上报心跳时返回None
    pub fn heartbeat_elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_heartbeat_at.map(|at| now - at)
    }

    /// 检查心跳是否超过指定阈值
    pub fn is_heartbeat_expired(&self, now: DateTime<Utc>, threshold_seconds: i64) -> bool {
        match self.heartbeat_elapsed(now) {
            Some(elapsed) => elapsed.num_seconds() > threshold_seconds,
            None => false,
        }
    }
}
