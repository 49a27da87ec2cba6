pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::*;
pub use errors::*;
pub use models::{
    JobStatus, NodeStatus, ProgressRecord, ResourceSample, StreamJob, VpsNode,
};
pub use traits::{
    AdminNotifier, JobRepository, KvStore, NodeRepository, RecoveryScheduler,
};

/// 统一的Result类型
pub type FleetResult<T> = std::result::Result<T, FleetError>;
