use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use streamfleet_core::models::{JobStatus, NodeStatus};
use streamfleet_core::{
    FleetResult, JobRepository, KvStore, NodeRepository, PartitionConfig, RecoveryScheduler,
};

use crate::lock::DistributedLock;
use crate::progress::ProgressTracker;

/// 节点级互斥锁的TTL，覆盖一次完整的分区或恢复处理
const NODE_LOCK_TTL: Duration = Duration::from_secs(30);

/// 分区标记，记录节点进入分区状态的时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMarker {
    pub node_id: i64,
    pub started_at: DateTime<Utc>,
}

/// 一次恢复对账的结果
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// 节点上仍然存活、已恢复为推流中的任务
    pub resumed_jobs: Vec<i64>,
    /// 分区期间已死亡、被标记为出错的任务
    pub lost_jobs: Vec<i64>,
}

/// 网络分区处理器
///
/// 心跳超时的节点被标记为分区态，其上的存活任务转入待恢复状态，
/// 并延迟调度一次恢复检查；节点重新上报后按其实际存活任务对账，
/// 恢复仍在推流的任务、判死分区期间丢失的任务。
///
/// 对同一节点的分区与恢复处理通过分布式锁内部串行化，
/// 多个调度实例并发触发时只有持锁方真正执行。
pub struct PartitionHandler {
    node_repo: Arc<dyn NodeRepository>,
    job_repo: Arc<dyn JobRepository>,
    store: Arc<dyn KvStore>,
    lock: Arc<DistributedLock>,
    progress: Arc<ProgressTracker>,
    recovery_scheduler: Arc<dyn RecoveryScheduler>,
    config: PartitionConfig,
}

impl PartitionHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_repo: Arc<dyn NodeRepository>,
        job_repo: Arc<dyn JobRepository>,
        store: Arc<dyn KvStore>,
        lock: Arc<DistributedLock>,
        progress: Arc<ProgressTracker>,
        recovery_scheduler: Arc<dyn RecoveryScheduler>,
        config: Option<PartitionConfig>,
    ) -> Self {
        Self {
            node_repo,
            job_repo,
            store,
            lock,
            progress,
            recovery_scheduler,
            config: config.unwrap_or_default(),
        }
    }

    fn marker_key(node_id: i64) -> String {
        format!("partition:{node_id}")
    }

    fn node_lock_key(node_id: i64) -> String {
        format!("node:{node_id}")
    }

    /// 检查节点心跳并在超时时将其转入分区态
    ///
    /// 返回true表示本次调用真正执行了分区处理；节点不存在、
    /// 从未上报心跳、心跳仍然新鲜或已处于分区态时返回false。
    /// 未能获取节点锁说明另一个实例正在处理，向上返回
    /// LockUnavailable错误，调用方不得假设处理已完成。
    pub async fn handle_partition(&self, node_id: i64) -> FleetResult<bool> {
        let Some(node) = self.node_repo.get_by_id(node_id).await? else {
            debug!("分区检查: 节点 {} 不存在", node_id);
            return Ok(false);
        };

        // 从未上报心跳的节点视为尚未上线，不判分区
        let now = Utc::now();
        if node.last_heartbeat_at.is_none() {
            debug!("分区检查: 节点 {} 从未上报心跳，跳过", node_id);
            return Ok(false);
        }
        if !node.is_heartbeat_expired(now, self.config.partition_threshold_seconds) {
            debug!("分区检查: 节点 {} 心跳正常", node_id);
            return Ok(false);
        }

        self.lock
            .with_lock(&Self::node_lock_key(node_id), NODE_LOCK_TTL, || {
                self.partition_node(node_id)
            })
            .await
    }

    /// 持有节点锁后执行的分区处理主体
    async fn partition_node(&self, node_id: i64) -> FleetResult<bool> {
        // 持锁后重读状态，另一个实例可能已经完成处理
        let Some(node) = self.node_repo.get_by_id(node_id).await? else {
            return Ok(false);
        };
        // 只有正常服务中的节点才进入分区状态机；
        // 管理员下线的节点心跳必然停更，但不属于故障检测的范畴
        if node.status != NodeStatus::Active {
            debug!("节点 {} 当前状态为 {:?}，不作分区处理", node_id, node.status);
            return Ok(false);
        }

        self.node_repo
            .update_status(node_id, NodeStatus::Partitioned)
            .await?;

        let marker = PartitionMarker {
            node_id,
            started_at: Utc::now(),
        };
        // 标记写入失败不回滚状态，恢复路径不依赖标记存在
        match serde_json::to_string(&marker) {
            Ok(payload) => {
                let ttl = Duration::from_secs(self.config.marker_ttl_seconds);
                if let Err(e) = self.store.set(&Self::marker_key(node_id), &payload, ttl).await {
                    warn!("写入节点 {} 的分区标记失败: {}", node_id, e);
                }
            }
            Err(e) => {
                warn!("序列化节点 {} 的分区标记失败: {}", node_id, e);
            }
        }

        let live_statuses = [JobStatus::Starting, JobStatus::Streaming];
        let jobs = self.job_repo.get_jobs_on_node(node_id, &live_statuses).await?;
        let mut transitioned = 0usize;
        for job in &jobs {
            let message = format!("节点 {} 疑似网络分区，任务待恢复确认", node_id);
            if let Err(e) = self
                .job_repo
                .update_status(job.id, JobStatus::Partitioned, Some(&message))
                .await
            {
                error!("标记任务 {} 为分区态失败: {}", job.id, e);
                continue;
            }
            transitioned += 1;

            self.progress
                .set_progress(
                    job.id,
                    "warning",
                    0,
                    "节点疑似网络分区，正在等待恢复检查",
                    None,
                )
                .await;
        }

        let grace = Duration::from_secs(self.config.recovery_grace_seconds);
        if let Err(e) = self
            .recovery_scheduler
            .schedule_recovery_check(node_id, grace)
            .await
        {
            error!("调度节点 {} 的恢复检查失败: {}", node_id, e);
        }

        info!(
            "节点 {} 已转入分区态，受影响任务 {}/{}",
            node_id,
            transitioned,
            jobs.len()
        );
        Ok(true)
    }

    /// 节点恢复上报后，按其实际存活任务对账
    ///
    /// `live_job_ids` 是节点自行上报的仍在推流的任务ID列表。
    /// 节点不存在或不处于分区态时直接返回空报告；
    /// 调度投递是至少一次语义，本方法可安全重复执行。
    pub async fn handle_recovery(
        &self,
        node_id: i64,
        live_job_ids: &[i64],
    ) -> FleetResult<RecoveryReport> {
        let Some(node) = self.node_repo.get_by_id(node_id).await? else {
            debug!("恢复检查: 节点 {} 不存在", node_id);
            return Ok(RecoveryReport::default());
        };
        if node.status != NodeStatus::Partitioned {
            debug!("恢复检查: 节点 {} 未处于分区态，跳过", node_id);
            return Ok(RecoveryReport::default());
        }

        self.lock
            .with_lock(&Self::node_lock_key(node_id), NODE_LOCK_TTL, || {
                self.reconcile_node(node_id, live_job_ids)
            })
            .await
    }

    /// 持有节点锁后执行的恢复对账主体
    async fn reconcile_node(
        &self,
        node_id: i64,
        live_job_ids: &[i64],
    ) -> FleetResult<RecoveryReport> {
        let Some(node) = self.node_repo.get_by_id(node_id).await? else {
            return Ok(RecoveryReport::default());
        };
        if node.status != NodeStatus::Partitioned {
            return Ok(RecoveryReport::default());
        }

        self.node_repo
            .update_status(node_id, NodeStatus::Active)
            .await?;
        self.node_repo.update_heartbeat(node_id, Utc::now()).await?;

        let partitioned = [JobStatus::Partitioned];
        let jobs = self.job_repo.get_jobs_on_node(node_id, &partitioned).await?;

        let mut report = RecoveryReport::default();
        for job in &jobs {
            if live_job_ids.contains(&job.id) {
                if let Err(e) = self
                    .job_repo
                    .update_status(job.id, JobStatus::Streaming, None)
                    .await
                {
                    error!("恢复任务 {} 为推流中失败: {}", job.id, e);
                    continue;
                }
                self.progress
                    .create_stage_progress(job.id, "streaming", Some("节点恢复，推流仍在进行"))
                    .await;
                report.resumed_jobs.push(job.id);
            } else {
                if let Err(e) = self
                    .job_repo
                    .update_status(job.id, JobStatus::Error, Some("died during partition"))
                    .await
                {
                    error!("标记任务 {} 为出错失败: {}", job.id, e);
                    continue;
                }
                if let Err(e) = self.job_repo.detach_from_node(job.id).await {
                    error!("解绑任务 {} 失败: {}", job.id, e);
                }
                if let Err(e) = self.node_repo.decrement_stream_count(node_id).await {
                    error!("减少节点 {} 推流计数失败: {}", node_id, e);
                }
                self.progress
                    .create_stage_progress(job.id, "error", Some("任务在分区期间已死亡"))
                    .await;
                report.lost_jobs.push(job.id);
            }
        }

        self.clear_partition_state(node_id).await;

        info!(
            "节点 {} 恢复完成: {} 个任务继续推流, {} 个任务已丢失",
            node_id,
            report.resumed_jobs.len(),
            report.lost_jobs.len()
        );
        Ok(report)
    }

    /// 节点当前是否带有分区标记
    pub async fn is_partitioned(&self, node_id: i64) -> bool {
        match self.store.exists(&Self::marker_key(node_id)).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("查询节点 {} 的分区标记失败: {}", node_id, e);
                false
            }
        }
    }

    /// 节点已处于分区态的时长，无标记时返回None
    pub async fn get_partition_duration(&self, node_id: i64) -> Option<chrono::Duration> {
        let raw = match self.store.get(&Self::marker_key(node_id)).await {
            Ok(v) => v?,
            Err(e) => {
                warn!("读取节点 {} 的分区标记失败: {}", node_id, e);
                return None;
            }
        };

        match serde_json::from_str::<PartitionMarker>(&raw) {
            Ok(marker) => Some(Utc::now() - marker.started_at),
            Err(e) => {
                warn!("解析节点 {} 的分区标记失败: {}", node_id, e);
                None
            }
        }
    }

    /// 清除节点的分区标记
    pub async fn clear_partition_state(&self, node_id: i64) -> bool {
        match self.store.delete(&Self::marker_key(node_id)).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("清除节点 {} 的分区标记失败: {}", node_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_key_format() {
        assert_eq!(PartitionHandler::marker_key(7), "partition:7");
        assert_eq!(PartitionHandler::node_lock_key(7), "node:7");
    }

    #[test]
    fn test_marker_roundtrip() {
        let marker = PartitionMarker {
            node_id: 3,
            started_at: Utc::now(),
        };
        let json = serde_json::to_string(&marker).unwrap();
        let parsed: PartitionMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.node_id, 3);
    }
}
