use async_trait::async_trait;

use crate::FleetResult;

/// 管理员通知能力（外部协作方）
///
/// 发送语义为发后不管：调用方对发送失败只记录日志，不向上传播。
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    /// 向全部管理员发送告警消息
    async fn notify_admins(&self, subject: &str, message: &str) -> FleetResult<()>;
}
