//! 节点调度与分区恢复
//!
//! 包含推流节点分配、分布式锁、网络分区处理与进度追踪四个组件。

pub mod allocation;
pub mod lock;
pub mod partition;
pub mod progress;

pub use allocation::NodeAllocator;
pub use lock::DistributedLock;
pub use partition::{PartitionHandler, PartitionMarker, RecoveryReport};
pub use progress::ProgressTracker;
