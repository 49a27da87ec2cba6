use std::sync::Arc;

use tracing::{debug, error, info, warn};

use streamfleet_core::models::{NodeStatus, VpsNode};
use streamfleet_core::{AdminNotifier, AllocationConfig, FleetResult, NodeRepository};

/// 推流节点分配器
///
/// 在活跃节点中按资源压力打分，选出得分最高的节点承接新任务。
/// 节点自行上报的容量信号优先于阈值推断；完全没有可用节点时
/// 通知管理员扩容。
pub struct NodeAllocator {
    node_repo: Arc<dyn NodeRepository>,
    notifier: Arc<dyn AdminNotifier>,
    config: AllocationConfig,
}

impl NodeAllocator {
    pub fn new(
        node_repo: Arc<dyn NodeRepository>,
        notifier: Arc<dyn AdminNotifier>,
        config: Option<AllocationConfig>,
    ) -> Self {
        Self {
            node_repo,
            notifier,
            config: config.unwrap_or_default(),
        }
    }

    /// 判断节点是否有资格承接新任务
    ///
    /// 内存和磁盘的硬性上限先于一切判断；上限之下，带容量信号的
    /// 节点以信号为准，否则按三项使用率阈值推断。
    pub fn is_eligible(&self, node: &VpsNode) -> bool {
        let Some(sample) = &node.resources else {
            // 新节点尚无采样，默认可用
            return true;
        };

        if sample.ram_percent >= self.config.ram_ceiling_percent {
            return false;
        }
        if sample.disk_percent >= self.config.disk_ceiling_percent {
            return false;
        }

        if let Some(capacity) = sample.available_capacity {
            return capacity > 0.0;
        }

        sample.cpu_percent < self.config.cpu_threshold_percent
            && sample.ram_percent < self.config.ram_threshold_percent
            && sample.disk_percent < self.config.disk_threshold_percent
    }

    /// 计算节点的分配得分，越高越优先
    ///
    /// 基础分为节点上报的容量信号（缺失时取默认容量），
    /// 减去超过起算点的内存与磁盘压力的加权惩罚，下限为0。
    pub fn score(&self, node: &VpsNode) -> f64 {
        let Some(sample) = &node.resources else {
            return self.config.default_capacity;
        };

        let base = sample
            .available_capacity
            .unwrap_or(self.config.default_capacity);

        let ram_pressure =
            (sample.ram_percent - self.config.penalty_free_percent).max(0.0);
        let disk_pressure =
            (sample.disk_percent - self.config.penalty_free_percent).max(0.0);

        let penalty = ram_pressure * self.config.ram_penalty_weight
            + disk_pressure * self.config.disk_penalty_weight;

        (base - penalty).max(0.0)
    }

    /// 选出最适合承接新任务的节点
    ///
    /// 没有任何节点满足条件时返回None并通知管理员扩容。
    /// 得分相同时保留先遇到的节点，候选池按节点ID排序，
    /// 因此同分情况下稳定选择ID较小的节点。
    pub async fn find_optimal_node(&self) -> FleetResult<Option<i64>> {
        let nodes = self.node_repo.list_by_status(NodeStatus::Active).await?;

        let eligible: Vec<&VpsNode> = nodes.iter().filter(|n| self.is_eligible(n)).collect();

        if eligible.is_empty() {
            warn!("没有满足资源要求的活跃节点，无法分配新推流任务");
            if let Err(e) = self
                .notifier
                .notify_admins(
                    "资源不足告警",
                    "当前没有任何VPS节点满足新推流任务的资源要求，请尽快扩容",
                )
                .await
            {
                error!("发送资源不足告警失败: {}", e);
            }
            return Ok(None);
        }

        let mut best: Option<(&VpsNode, f64)> = None;
        for node in eligible {
            let score = self.score(node);
            debug!("节点 {} ({}) 分配得分: {:.2}", node.id, node.name, score);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((node, score)),
            }
        }

        let Some((node, score)) = best else {
            return Ok(None);
        };

        info!(
            "选中节点 {} ({}) 承接新推流任务，得分 {:.2}",
            node.id, node.name, score
        );
        Ok(Some(node.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamfleet_testing_utils::{MockAdminNotifier, MockNodeRepository, VpsNodeBuilder};

    fn allocator_with(repo: MockNodeRepository) -> (NodeAllocator, Arc<MockAdminNotifier>) {
        let notifier = Arc::new(MockAdminNotifier::new());
        let allocator = NodeAllocator::new(Arc::new(repo), notifier.clone(), None);
        (allocator, notifier)
    }

    #[test]
    fn test_node_without_sample_is_eligible() {
        let (allocator, _) = allocator_with(MockNodeRepository::new());
        let node = VpsNodeBuilder::new().build();
        assert!(allocator.is_eligible(&node));
    }

    #[test]
    fn test_ceilings_exclude_regardless_of_capacity_signal() {
        let (allocator, _) = allocator_with(MockNodeRepository::new());

        let ram_full = VpsNodeBuilder::new()
            .with_resources(10.0, 92.0, 10.0)
            .with_available_capacity(50.0)
            .build();
        assert!(!allocator.is_eligible(&ram_full));

        let disk_full = VpsNodeBuilder::new()
            .with_resources(10.0, 10.0, 96.0)
            .with_available_capacity(50.0)
            .build();
        assert!(!allocator.is_eligible(&disk_full));
    }

    #[test]
    fn test_capacity_signal_overrides_thresholds() {
        let (allocator, _) = allocator_with(MockNodeRepository::new());

        // CPU超过阈值，但容量信号为正，仍然可用
        let busy_but_capable = VpsNodeBuilder::new()
            .with_resources(95.0, 50.0, 50.0)
            .with_available_capacity(10.0)
            .build();
        assert!(allocator.is_eligible(&busy_but_capable));

        // 使用率都在阈值内，但容量信号为0，排除
        let idle_but_exhausted = VpsNodeBuilder::new()
            .with_resources(10.0, 10.0, 10.0)
            .with_available_capacity(0.0)
            .build();
        assert!(!allocator.is_eligible(&idle_but_exhausted));
    }

    #[test]
    fn test_threshold_inference_without_capacity_signal() {
        let (allocator, _) = allocator_with(MockNodeRepository::new());

        let healthy = VpsNodeBuilder::new()
            .with_resources(50.0, 50.0, 50.0)
            .build();
        assert!(allocator.is_eligible(&healthy));

        let cpu_hot = VpsNodeBuilder::new()
            .with_resources(85.0, 50.0, 50.0)
            .build();
        assert!(!allocator.is_eligible(&cpu_hot));
    }

    #[test]
    fn test_score_penalizes_pressure() {
        let (allocator, _) = allocator_with(MockNodeRepository::new());

        let no_sample = VpsNodeBuilder::new().build();
        assert_eq!(allocator.score(&no_sample), 100.0);

        // 内存80%超出起算点10个点，惩罚 10*2=20
        let ram_pressured = VpsNodeBuilder::new()
            .with_resources(10.0, 80.0, 10.0)
            .build();
        assert_eq!(allocator.score(&ram_pressured), 80.0);

        // 磁盘80%超出起算点10个点，惩罚 10*3=30
        let disk_pressured = VpsNodeBuilder::new()
            .with_resources(10.0, 10.0, 80.0)
            .build();
        assert_eq!(allocator.score(&disk_pressured), 70.0);
    }

    #[test]
    fn test_score_never_negative() {
        let (allocator, _) = allocator_with(MockNodeRepository::new());
        let overloaded = VpsNodeBuilder::new()
            .with_resources(10.0, 89.0, 94.0)
            .with_available_capacity(5.0)
            .build();
        assert_eq!(allocator.score(&overloaded), 0.0);
    }
}
