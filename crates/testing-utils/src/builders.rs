//! Test data builders for creating fleet entities with sensible defaults

use chrono::{DateTime, Utc};

use streamfleet_core::models::{JobStatus, NodeStatus, ResourceSample, StreamJob, VpsNode};

/// Builder for creating test VpsNode entities
pub struct VpsNodeBuilder {
    node: VpsNode,
}

impl VpsNodeBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            node: VpsNode {
                id: 1,
                name: "test-node".to_string(),
                ip_address: "127.0.0.1".to_string(),
                status: NodeStatus::Active,
                current_streams: 0,
                last_heartbeat_at: Some(now),
                resources: None,
                registered_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.node.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.node.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.node.status = status;
        self
    }

    pub fn with_last_heartbeat(mut self, at: DateTime<Utc>) -> Self {
        self.node.last_heartbeat_at = Some(at);
        self
    }

    pub fn with_no_heartbeat(mut self) -> Self {
        self.node.last_heartbeat_at = None;
        self
    }

    pub fn with_current_streams(mut self, count: i32) -> Self {
        self.node.current_streams = count;
        self
    }

    /// Attach a resource sample; available_capacity stays unset
    pub fn with_resources(mut self, cpu: f64, ram: f64, disk: f64) -> Self {
        self.node.resources = Some(ResourceSample {
            cpu_percent: cpu,
            ram_percent: ram,
            disk_percent: disk,
            available_capacity: None,
            sampled_at: Utc::now(),
        });
        self
    }

    /// Set the node-reported capacity signal, creating an empty sample if needed
    pub fn with_available_capacity(mut self, capacity: f64) -> Self {
        let sample = self.node.resources.get_or_insert(ResourceSample {
            cpu_percent: 0.0,
            ram_percent: 0.0,
            disk_percent: 0.0,
            available_capacity: None,
            sampled_at: Utc::now(),
        });
        sample.available_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> VpsNode {
        self.node
    }
}

impl Default for VpsNodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test StreamJob entities
pub struct StreamJobBuilder {
    job: StreamJob,
}

impl StreamJobBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            job: StreamJob {
                id: 0,
                stream_key: "test-stream".to_string(),
                status: JobStatus::Pending,
                vps_node_id: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.job.id = id;
        self
    }

    pub fn with_stream_key(mut self, key: &str) -> Self {
        self.job.stream_key = key.to_string();
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn with_node(mut self, node_id: i64) -> Self {
        self.job.vps_node_id = Some(node_id);
        self
    }

    pub fn with_error_message(mut self, message: &str) -> Self {
        self.job.error_message = Some(message.to_string());
        self
    }

    pub fn build(self) -> StreamJob {
        self.job
    }
}

impl Default for StreamJobBuilder {
    fn default() -> Self {
        Self::new()
    }
}
