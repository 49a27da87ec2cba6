use thiserror::Error;

/// 集群调度器错误类型定义
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("节点未找到: {id}")]
    NodeNotFound { id: i64 },

    #[error("推流任务未找到: {id}")]
    JobNotFound { id: i64 },

    #[error("缓存错误: {0}")]
    CacheError(String),

    #[error("锁不可用: {key}")]
    LockUnavailable { key: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("通知发送错误: {0}")]
    Notification(String),

    #[error("内部错误: {0}")]
    Internal(String),
}
