use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 推流进度记录
///
/// 短暂数据：写入后按固定TTL过期，过期与从未写入对调用方不可区分，
/// 调用方应以任务持久状态合成的默认进度作为回退。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub stream_id: i64,
    pub stage: String,
    pub progress_percentage: u8,
    pub message: String,
    pub details: Option<Value>,
    pub updated_at: DateTime<Utc>,
    /// 进度达到100时写入
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// 创建进度记录，百分比截断到[0,100]，达到100时记录完成时间
    pub fn new(
        stream_id: i64,
        stage: &str,
        percentage: i32,
        message: &str,
        details: Option<Value>,
    ) -> Self {
        let clamped = percentage.clamp(0, 100) as u8;
        let now = Utc::now();
        Self {
            stream_id,
            stage: stage.to_string(),
            progress_percentage: clamped,
            message: message.to_string(),
            details,
            updated_at: now,
            completed_at: (clamped == 100).then_some(now),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_clamped() {
        let over = ProgressRecord::new(1, "downloading", 150, "msg", None);
        assert_eq!(over.progress_percentage, 100);
        assert!(over.is_completed());

        let under = ProgressRecord::new(1, "preparing", -5, "msg", None);
        assert_eq!(under.progress_percentage, 0);
        assert!(!under.is_completed());
    }

    #[test]
    fn test_completed_at_only_at_hundred() {
        let halfway = ProgressRecord::new(1, "downloading", 50, "msg", None);
        assert!(halfway.completed_at.is_none());

        let done = ProgressRecord::new(1, "streaming", 100, "msg", None);
        assert!(done.completed_at.is_some());
    }
}
