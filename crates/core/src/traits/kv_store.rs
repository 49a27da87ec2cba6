use std::time::Duration;

use async_trait::async_trait;

use crate::FleetResult;

/// 带TTL与原子条件操作的共享键值存储能力
///
/// 分布式锁依赖其中两个原子原语：不存在才写入（带过期时间）和
/// 比较当前值后删除。两者都必须是针对存储的单次不可分操作，
/// 不允许用GET加DELETE两步模拟。
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> FleetResult<Option<String>>;

    /// 写入并设置过期时间，已存在时覆盖
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> FleetResult<()>;

    /// 键不存在时才写入（带过期时间），返回是否写入成功
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> FleetResult<bool>;

    /// 删除键，返回键是否存在
    async fn delete(&self, key: &str) -> FleetResult<bool>;

    /// 原子地比较当前值并删除，值不匹配或键不存在时不删除并返回false
    async fn delete_if_equals(&self, key: &str, expected: &str) -> FleetResult<bool>;

    async fn exists(&self, key: &str) -> FleetResult<bool>;

    /// 键的剩余存活时间，键不存在（或已过期）时返回None
    async fn ttl_remaining(&self, key: &str) -> FleetResult<Option<Duration>>;
}
