//! 节点分配器集成测试

use std::sync::Arc;

use streamfleet_core::models::NodeStatus;
use streamfleet_core::AllocationConfig;
use streamfleet_fleet::NodeAllocator;
use streamfleet_testing_utils::{MockAdminNotifier, MockNodeRepository, VpsNodeBuilder};

fn allocator(repo: MockNodeRepository) -> (NodeAllocator, Arc<MockAdminNotifier>) {
    let notifier = Arc::new(MockAdminNotifier::new());
    (
        NodeAllocator::new(Arc::new(repo), notifier.clone(), None),
        notifier,
    )
}

#[tokio::test]
async fn test_picks_node_with_highest_score() {
    let repo = MockNodeRepository::with_nodes(vec![
        // 内存压力大，得分低
        VpsNodeBuilder::new().with_id(1).with_resources(20.0, 85.0, 20.0).build(),
        // 资源空闲，得分高
        VpsNodeBuilder::new().with_id(2).with_resources(20.0, 30.0, 30.0).build(),
        // 中等压力
        VpsNodeBuilder::new().with_id(3).with_resources(20.0, 75.0, 20.0).build(),
    ]);
    let (allocator, notifier) = allocator(repo);

    assert_eq!(allocator.find_optimal_node().await.unwrap(), Some(2));
    assert_eq!(notifier.notification_count(), 0);
}

#[tokio::test]
async fn test_mixed_pool_prefers_unsampled_default() {
    let repo = MockNodeRepository::with_nodes(vec![
        // 内存到达硬性上限，直接排除
        VpsNodeBuilder::new().with_id(1).with_resources(20.0, 95.0, 20.0).build(),
        // 容量信号40，无压力惩罚
        VpsNodeBuilder::new()
            .with_id(2)
            .with_resources(20.0, 60.0, 60.0)
            .with_available_capacity(40.0)
            .build(),
        // 无采样，按默认容量100参与
        VpsNodeBuilder::new().with_id(3).build(),
    ]);
    let (allocator, _) = allocator(repo);

    assert_eq!(allocator.find_optimal_node().await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_tie_breaks_to_lowest_id() {
    let repo = MockNodeRepository::with_nodes(vec![
        VpsNodeBuilder::new().with_id(7).with_resources(10.0, 20.0, 20.0).build(),
        VpsNodeBuilder::new().with_id(3).with_resources(10.0, 20.0, 20.0).build(),
        VpsNodeBuilder::new().with_id(5).with_resources(10.0, 20.0, 20.0).build(),
    ]);
    let (allocator, _) = allocator(repo);

    // 候选池按ID排序，同分保留先遇到的节点
    assert_eq!(allocator.find_optimal_node().await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_capacity_signal_drives_selection() {
    let repo = MockNodeRepository::with_nodes(vec![
        VpsNodeBuilder::new()
            .with_id(1)
            .with_resources(10.0, 10.0, 10.0)
            .with_available_capacity(20.0)
            .build(),
        VpsNodeBuilder::new()
            .with_id(2)
            .with_resources(10.0, 10.0, 10.0)
            .with_available_capacity(60.0)
            .build(),
    ]);
    let (allocator, _) = allocator(repo);

    assert_eq!(allocator.find_optimal_node().await.unwrap(), Some(2));
}

#[tokio::test]
async fn test_unsampled_node_gets_default_capacity() {
    let repo = MockNodeRepository::with_nodes(vec![
        // 新注册节点无采样，按默认容量参与竞争
        VpsNodeBuilder::new().with_id(1).build(),
        VpsNodeBuilder::new()
            .with_id(2)
            .with_resources(10.0, 10.0, 10.0)
            .with_available_capacity(50.0)
            .build(),
    ]);
    let (allocator, _) = allocator(repo);

    assert_eq!(allocator.find_optimal_node().await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_only_active_nodes_considered() {
    let repo = MockNodeRepository::with_nodes(vec![
        VpsNodeBuilder::new()
            .with_id(1)
            .with_status(NodeStatus::Partitioned)
            .with_resources(10.0, 10.0, 10.0)
            .build(),
        VpsNodeBuilder::new()
            .with_id(2)
            .with_status(NodeStatus::Inactive)
            .with_resources(10.0, 10.0, 10.0)
            .build(),
        VpsNodeBuilder::new().with_id(3).with_resources(50.0, 50.0, 50.0).build(),
    ]);
    let (allocator, _) = allocator(repo);

    assert_eq!(allocator.find_optimal_node().await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_exhausted_pool_notifies_admins() {
    let repo = MockNodeRepository::with_nodes(vec![
        // 内存到达硬性上限
        VpsNodeBuilder::new().with_id(1).with_resources(10.0, 95.0, 10.0).build(),
        // 容量信号耗尽
        VpsNodeBuilder::new()
            .with_id(2)
            .with_resources(10.0, 10.0, 10.0)
            .with_available_capacity(0.0)
            .build(),
    ]);
    let (allocator, notifier) = allocator(repo);

    assert_eq!(allocator.find_optimal_node().await.unwrap(), None);
    assert_eq!(notifier.notification_count(), 1);
    let (subject, _) = notifier.last_notification().unwrap();
    assert_eq!(subject, "资源不足告警");
}

#[tokio::test]
async fn test_empty_pool_notifies_admins() {
    let (allocator, notifier) = allocator(MockNodeRepository::new());

    assert_eq!(allocator.find_optimal_node().await.unwrap(), None);
    assert_eq!(notifier.notification_count(), 1);
}

#[tokio::test]
async fn test_custom_config_thresholds() {
    let repo = MockNodeRepository::with_nodes(vec![
        VpsNodeBuilder::new().with_id(1).with_resources(60.0, 50.0, 50.0).build(),
    ]);
    let notifier = Arc::new(MockAdminNotifier::new());
    let config = AllocationConfig {
        cpu_threshold_percent: 55.0,
        ..Default::default()
    };
    let allocator = NodeAllocator::new(Arc::new(repo), notifier.clone(), Some(config));

    // 收紧CPU阈值后该节点被排除
    assert_eq!(allocator.find_optimal_node().await.unwrap(), None);
    assert_eq!(notifier.notification_count(), 1);
}
