use std::time::Duration;

use async_trait::async_trait;

use crate::FleetResult;

/// 延迟任务分发能力（外部协作方）
///
/// 投递语义为至少一次：被调度的恢复检查可能重复触发，
/// 回调实现必须在执行时重读当前状态并保证幂等。
#[async_trait]
pub trait RecoveryScheduler: Send + Sync {
    /// 延迟指定时长后调度一次节点恢复检查
    async fn schedule_recovery_check(&self, node_id: i64, delay: Duration) -> FleetResult<()>;
}
