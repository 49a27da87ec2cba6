use serde::{Deserialize, Serialize};

/// 分布式锁配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// 获取失败后的重试间隔（毫秒）
    pub retry_delay_ms: u64,
    /// 最大尝试次数
    pub max_attempts: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 100, // 固定100毫秒退避
            max_attempts: 50,    // 总预算约5秒
        }
    }
}

impl LockConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retry_delay_ms == 0 {
            return Err(anyhow::anyhow!("锁重试间隔必须大于0"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow::anyhow!("锁最大尝试次数必须大于0"));
        }
        Ok(())
    }
}

/// 进度通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// 进度记录的保留时长（秒）
    pub ttl_seconds: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { ttl_seconds: 1800 }
    }
}

impl ProgressConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ttl_seconds == 0 {
            return Err(anyhow::anyhow!("进度记录保留时长必须大于0"));
        }
        Ok(())
    }
}

/// 分区检测与恢复配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// 心跳超过该时长后判定为分区（秒）
    pub partition_threshold_seconds: i64,
    /// 分区开始标记的过期时间（秒），防止恢复逻辑从未执行时标记长期残留
    pub marker_ttl_seconds: u64,
    /// 分区判定后到恢复检查之间的宽限期（秒）
    pub recovery_grace_seconds: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            partition_threshold_seconds: 300, // 5分钟心跳超时
            marker_ttl_seconds: 3600,         // 标记最多保留1小时
            recovery_grace_seconds: 120,      // 2分钟宽限期
        }
    }
}

impl PartitionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.partition_threshold_seconds <= 0 {
            return Err(anyhow::anyhow!("分区阈值必须大于0"));
        }
        if self.marker_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("分区标记过期时间必须大于0"));
        }
        if self.recovery_grace_seconds == 0 {
            return Err(anyhow::anyhow!("恢复宽限期必须大于0"));
        }
        Ok(())
    }
}

/// 节点分配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 内存硬性安全上限（百分比），达到即排除
    pub ram_ceiling_percent: f64,
    /// 磁盘硬性安全上限（百分比），达到即排除
    pub disk_ceiling_percent: f64,
    /// 无容量信号时的CPU排除阈值（百分比）
    pub cpu_threshold_percent: f64,
    /// 无容量信号时的内存排除阈值（百分比）
    pub ram_threshold_percent: f64,
    /// 无容量信号时的磁盘排除阈值（百分比）
    pub disk_threshold_percent: f64,
    /// 超过该使用率后开始计入压力惩罚（百分比）
    pub penalty_free_percent: f64,
    /// 内存压力惩罚权重
    pub ram_penalty_weight: f64,
    /// 磁盘压力惩罚权重，磁盘耗尽对推流更难恢复，权重更高
    pub disk_penalty_weight: f64,
    /// 无资源采样节点的默认容量得分
    pub default_capacity: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            ram_ceiling_percent: 90.0,
            disk_ceiling_percent: 95.0,
            cpu_threshold_percent: 80.0,
            ram_threshold_percent: 85.0,
            disk_threshold_percent: 90.0,
            penalty_free_percent: 70.0,
            ram_penalty_weight: 2.0,
            disk_penalty_weight: 3.0,
            default_capacity: 100.0,
        }
    }
}

impl AllocationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("内存安全上限", self.ram_ceiling_percent),
            ("磁盘安全上限", self.disk_ceiling_percent),
            ("CPU排除阈值", self.cpu_threshold_percent),
            ("内存排除阈值", self.ram_threshold_percent),
            ("磁盘排除阈值", self.disk_threshold_percent),
        ] {
            if value <= 0.0 || value > 100.0 {
                return Err(anyhow::anyhow!("{name}必须在(0, 100]范围内: {value}"));
            }
        }
        if self.penalty_free_percent < 0.0 || self.penalty_free_percent >= 100.0 {
            return Err(anyhow::anyhow!(
                "惩罚起算点必须在[0, 100)范围内: {}",
                self.penalty_free_percent
            ));
        }
        if self.ram_penalty_weight < 0.0 || self.disk_penalty_weight < 0.0 {
            return Err(anyhow::anyhow!("压力惩罚权重不能为负"));
        }
        if self.default_capacity <= 0.0 {
            return Err(anyhow::anyhow!("默认容量得分必须大于0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_config_default() {
        let config = LockConfig::default();
        assert_eq!(config.retry_delay_ms, 100);
        assert_eq!(config.max_attempts, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partition_config_default() {
        let config = PartitionConfig::default();
        assert_eq!(config.partition_threshold_seconds, 300);
        assert_eq!(config.marker_ttl_seconds, 3600);
        assert_eq!(config.recovery_grace_seconds, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_progress_config_default() {
        let config = ProgressConfig::default();
        assert_eq!(config.ttl_seconds, 1800);
    }

    #[test]
    fn test_allocation_config_default() {
        let config = AllocationConfig::default();
        assert_eq!(config.ram_ceiling_percent, 90.0);
        assert_eq!(config.disk_ceiling_percent, 95.0);
        assert_eq!(config.penalty_free_percent, 70.0);
        assert_eq!(config.disk_penalty_weight, 3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let lock = LockConfig {
            retry_delay_ms: 0,
            max_attempts: 50,
        };
        assert!(lock.validate().is_err());

        let mut allocation = AllocationConfig::default();
        allocation.ram_ceiling_percent = 120.0;
        assert!(allocation.validate().is_err());

        let partition = PartitionConfig {
            partition_threshold_seconds: -1,
            ..Default::default()
        };
        assert!(partition.validate().is_err());
    }
}
