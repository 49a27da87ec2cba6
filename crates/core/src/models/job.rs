use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 推流任务信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamJob {
    pub id: i64,
    pub stream_key: String,
    pub status: JobStatus,
    /// 任务当前所在节点，未分配或已解绑时为空
    pub vps_node_id: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 推流任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "STARTING")]
    Starting,
    #[serde(rename = "STREAMING")]
    Streaming,
    /// 所在节点疑似网络分区，等待恢复对账
    #[serde(rename = "PARTITIONED")]
    Partitioned,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "STOPPED")]
    Stopped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Starting => "STARTING",
            JobStatus::Streaming => "STREAMING",
            JobStatus::Partitioned => "PARTITIONED",
            JobStatus::Error => "ERROR",
            JobStatus::Stopped => "STOPPED",
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for JobStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for JobStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "STARTING" => Ok(JobStatus::Starting),
            "STREAMING" => Ok(JobStatus::Streaming),
            "PARTITIONED" => Ok(JobStatus::Partitioned),
            "ERROR" => Ok(JobStatus::Error),
            "STOPPED" => Ok(JobStatus::Stopped),
            _ => Err(format!("Invalid job status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for JobStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl StreamJob {
    /// 任务是否处于节点上实际运行（或正在启动）的状态
    pub fn is_live(&self) -> bool {
        matches!(self.status, JobStatus::Starting | JobStatus::Streaming)
    }
}
