use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use streamfleet_core::models::{JobStatus, ProgressRecord};
use streamfleet_core::{KvStore, ProgressConfig};

/// 推流进度追踪器
///
/// 进度是诊断用的易失状态，写入带TTL的键值存储而不落库；
/// 长时间无更新的记录自动过期。所有操作都是尽力而为：
/// 存储失败只记录日志，绝不让进度上报阻断推流流程。
pub struct ProgressTracker {
    store: Arc<dyn KvStore>,
    config: ProgressConfig,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn KvStore>, config: Option<ProgressConfig>) -> Self {
        Self {
            store,
            config: config.unwrap_or_default(),
        }
    }

    fn progress_key(stream_id: i64) -> String {
        format!("stream_progress:{stream_id}")
    }

    /// 预定义推流阶段的默认百分比与提示文案
    fn stage_defaults(stage: &str) -> Option<(u8, &'static str)> {
        match stage {
            "preparing" => Some((5, "正在准备推流任务")),
            "command_sent" => Some((10, "推流指令已下发")),
            "validating" => Some((15, "正在校验推流参数")),
            "preparing_video" => Some((20, "正在准备视频资源")),
            "downloading" => Some((50, "正在下载视频文件")),
            "file_ready" => Some((70, "视频文件已就绪")),
            "building_command" => Some((75, "正在构建推流命令")),
            "starting_ffmpeg" => Some((80, "正在启动FFmpeg")),
            "ffmpeg_started" => Some((90, "FFmpeg已启动")),
            "streaming" => Some((100, "推流中")),
            "error" => Some((0, "推流出错")),
            _ => None,
        }
    }

    /// 写入一条进度记录，覆盖同一任务的旧记录并重置TTL
    ///
    /// 百分比超出[0, 100]会被钳制；达到100时记录完成时间。
    pub async fn set_progress(
        &self,
        stream_id: i64,
        stage: &str,
        percentage: i32,
        message: &str,
        details: Option<Value>,
    ) -> bool {
        let record = ProgressRecord::new(stream_id, stage, percentage, message, details);

        let payload = match serde_json::to_string(&record) {
            Ok(p) => p,
            Err(e) => {
                warn!("序列化任务 {} 的进度记录失败: {}", stream_id, e);
                return false;
            }
        };

        let key = Self::progress_key(stream_id);
        let ttl = Duration::from_secs(self.config.ttl_seconds);
        match self.store.set(&key, &payload, ttl).await {
            Ok(()) => {
                debug!(
                    "更新任务 {} 进度: {} {}% - {}",
                    stream_id, record.stage, record.progress_percentage, record.message
                );
                true
            }
            Err(e) => {
                warn!("写入任务 {} 的进度记录失败: {}", stream_id, e);
                false
            }
        }
    }

    /// 读取当前进度，不存在或已过期返回None
    pub async fn get_progress(&self, stream_id: i64) -> Option<ProgressRecord> {
        let key = Self::progress_key(stream_id);
        let raw = match self.store.get(&key).await {
            Ok(v) => v?,
            Err(e) => {
                warn!("读取任务 {} 的进度记录失败: {}", stream_id, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("解析任务 {} 的进度记录失败: {}", stream_id, e);
                None
            }
        }
    }

    /// 没有进度记录时，按任务当前状态合成一条展示用的记录
    pub fn get_default_progress(&self, status: JobStatus, stream_id: i64) -> ProgressRecord {
        let (stage, percentage, message) = match status {
            JobStatus::Starting => ("starting", 10, "推流启动中"),
            JobStatus::Streaming => ("streaming", 100, "推流中"),
            JobStatus::Error => ("error", 0, "推流出错"),
            _ => ("idle", 0, "暂无进行中的操作"),
        };
        ProgressRecord::new(stream_id, stage, percentage, message, None)
    }

    /// 删除进度记录，任务结束时调用
    pub async fn clear_progress(&self, stream_id: i64) -> bool {
        let key = Self::progress_key(stream_id);
        match self.store.delete(&key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("清除任务 {} 的进度记录失败: {}", stream_id, e);
                false
            }
        }
    }

    /// 按预定义阶段写入进度，消息可被调用方覆盖
    ///
    /// 未知阶段不写入任何记录。
    pub async fn create_stage_progress(
        &self,
        stream_id: i64,
        stage: &str,
        message: Option<&str>,
    ) -> bool {
        let Some((percentage, default_message)) = Self::stage_defaults(stage) else {
            warn!("未知的进度阶段: {}", stage);
            return false;
        };

        let message = message.unwrap_or(default_message);
        self.set_progress(stream_id, stage, percentage as i32, message, None)
            .await
    }
}
