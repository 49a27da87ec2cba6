//! StreamFleet — VPS集群调度与分区恢复子系统
//!
//! 核心包含四个组件：节点分配调度、分布式互斥锁、分区检测与恢复对账、
//! 以及短暂的进度上报通道。本crate作为统一入口聚合各子crate的公共接口。

pub use streamfleet_core::{FleetError, FleetResult};
pub use streamfleet_fleet::{
    DistributedLock, NodeAllocator, PartitionHandler, ProgressTracker, RecoveryReport,
};

pub use streamfleet_core as core;
pub use streamfleet_fleet as fleet;
pub use streamfleet_infrastructure as infrastructure;

/// 初始化结构化日志输出，日志级别由 RUST_LOG 环境变量控制
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
