use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use uuid::Uuid;

use streamfleet_core::{FleetError, FleetResult, KvStore, LockConfig};

/// 分布式互斥锁
///
/// 基于共享键值存储的原子条件写实现。TTL保证持有方崩溃后锁自行过期，
/// 无需外部看门狗；释放时校验持有token，防止延迟的释放误删
/// TTL过期后被其他持有方重新获取的锁。
///
/// 同一个键在任意时刻最多只有一个存活的持有token；等待方之间没有
/// 顺序保证，重试中的等待方可能被更晚发起的尝试抢先。
pub struct DistributedLock {
    store: Arc<dyn KvStore>,
    config: LockConfig,
    host_id: String,
}

impl DistributedLock {
    /// 创建新的分布式锁
    pub fn new(store: Arc<dyn KvStore>, config: Option<LockConfig>) -> Self {
        let host_id = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string());

        Self {
            store,
            config: config.unwrap_or_default(),
            host_id,
        }
    }

    fn lock_key(key: &str) -> String {
        format!("lock:{key}")
    }

    /// 生成全局唯一的持有token：主机标识加随机UUID
    fn new_token(&self) -> String {
        format!("{}-{}", self.host_id, Uuid::new_v4())
    }

    /// 尝试获取锁
    ///
    /// 获取失败时固定间隔退避重试，超出尝试预算后返回None。
    /// 调用方必须把None当作"无法串行化，不得继续"，而不是乐观地继续执行。
    /// 存储操作失败同样消耗一次尝试，只记录日志不向上传播。
    pub async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        max_attempts: Option<u32>,
    ) -> Option<String> {
        let attempts = max_attempts.unwrap_or(self.config.max_attempts);
        let full_key = Self::lock_key(key);
        let token = self.new_token();

        for attempt in 1..=attempts {
            match self.store.set_nx(&full_key, &token, ttl).await {
                Ok(true) => {
                    debug!("获取锁成功: {} (尝试 {}/{})", key, attempt, attempts);
                    return Some(token);
                }
                Ok(false) => {
                    debug!("锁 {} 已被持有 (尝试 {}/{})", key, attempt, attempts);
                }
                Err(e) => {
                    warn!("获取锁 {} 时存储操作失败 (尝试 {}/{}): {}", key, attempt, attempts, e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        debug!("获取锁 {} 失败，已达到最大尝试次数 {}", key, attempts);
        None
    }

    /// 释放自己持有的锁
    ///
    /// 通过原子的比较并删除校验持有者。token不匹配说明锁已过期并被
    /// 其他持有方重新获取，对晚完成工作的原持有方而言是正常结果，
    /// 返回false并记录日志，不视为错误。
    pub async fn release(&self, key: &str, token: &str) -> bool {
        let full_key = Self::lock_key(key);
        match self.store.delete_if_equals(&full_key, token).await {
            Ok(true) => {
                debug!("释放锁成功: {}", key);
                true
            }
            Ok(false) => {
                warn!("释放锁 {} 时token不匹配，锁可能已过期并被其他持有方获取", key);
                false
            }
            Err(e) => {
                error!("释放锁 {} 时存储操作失败: {}", key, e);
                false
            }
        }
    }

    /// 在锁保护下执行闭包
    ///
    /// 获取失败时返回 [`FleetError::LockUnavailable`] 且不执行闭包；
    /// 无论闭包成功与否，返回前都保证尝试释放一次。
    pub async fn with_lock<F, Fut, T>(&self, key: &str, ttl: Duration, f: F) -> FleetResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FleetResult<T>>,
    {
        let token = self
            .acquire(key, ttl, None)
            .await
            .ok_or_else(|| FleetError::LockUnavailable {
                key: key.to_string(),
            })?;

        let result = f().await;
        self.release(key, &token).await;
        result
    }

    /// 锁当前是否被持有
    pub async fn exists(&self, key: &str) -> FleetResult<bool> {
        self.store.exists(&Self::lock_key(key)).await
    }

    /// 锁的剩余存活时间
    pub async fn ttl_remaining(&self, key: &str) -> FleetResult<Option<Duration>> {
        self.store.ttl_remaining(&Self::lock_key(key)).await
    }

    /// 管理用的强制释放，绕过持有者校验
    pub async fn force_release(&self, key: &str) -> FleetResult<bool> {
        warn!("强制释放锁: {}", key);
        self.store.delete(&Self::lock_key(key)).await
    }
}
