//! Mock implementations for repository and collaborator traits
//!
//! In-memory test doubles that can be used for unit testing without a real
//! database, key-value store or notification channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use streamfleet_core::models::{JobStatus, NodeStatus, ResourceSample, StreamJob, VpsNode};
use streamfleet_core::traits::{AdminNotifier, JobRepository, NodeRepository, RecoveryScheduler};
use streamfleet_core::{FleetError, FleetResult};

/// Mock implementation of NodeRepository for testing
#[derive(Debug, Clone, Default)]
pub struct MockNodeRepository {
    nodes: Arc<Mutex<HashMap<i64, VpsNode>>>,
}

impl MockNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<VpsNode>) -> Self {
        let map = nodes.into_iter().map(|n| (n.id, n)).collect();
        Self {
            nodes: Arc::new(Mutex::new(map)),
        }
    }

    pub fn clear(&self) {
        self.nodes.lock().unwrap().clear();
    }

    pub fn count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }
}

#[async_trait]
impl NodeRepository for MockNodeRepository {
    async fn register(&self, node: &VpsNode) -> FleetResult<()> {
        self.nodes.lock().unwrap().insert(node.id, node.clone());
        Ok(())
    }

    async fn get_by_id(&self, node_id: i64) -> FleetResult<Option<VpsNode>> {
        Ok(self.nodes.lock().unwrap().get(&node_id).cloned())
    }

    async fn list(&self) -> FleetResult<Vec<VpsNode>> {
        let mut nodes: Vec<VpsNode> = self.nodes.lock().unwrap().values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        Ok(nodes)
    }

    async fn list_by_status(&self, status: NodeStatus) -> FleetResult<Vec<VpsNode>> {
        let mut nodes: Vec<VpsNode> = self
            .nodes
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.status == status)
            .cloned()
            .collect();
        // Pool order is by node id, matching the Postgres implementation
        nodes.sort_by_key(|n| n.id);
        Ok(nodes)
    }

    async fn update_status(&self, node_id: i64, status: NodeStatus) -> FleetResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(&node_id)
            .ok_or(FleetError::NodeNotFound { id: node_id })?;
        node.status = status;
        Ok(())
    }

    async fn update_heartbeat(
        &self,
        node_id: i64,
        heartbeat_time: DateTime<Utc>,
    ) -> FleetResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(&node_id)
            .ok_or(FleetError::NodeNotFound { id: node_id })?;
        node.last_heartbeat_at = Some(heartbeat_time);
        Ok(())
    }

    async fn update_resources(&self, node_id: i64, sample: &ResourceSample) -> FleetResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(&node_id)
            .ok_or(FleetError::NodeNotFound { id: node_id })?;
        node.resources = Some(sample.clone());
        Ok(())
    }

    async fn increment_stream_count(&self, node_id: i64) -> FleetResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(&node_id)
            .ok_or(FleetError::NodeNotFound { id: node_id })?;
        node.current_streams += 1;
        Ok(())
    }

    async fn decrement_stream_count(&self, node_id: i64) -> FleetResult<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .get_mut(&node_id)
            .ok_or(FleetError::NodeNotFound { id: node_id })?;
        node.current_streams = (node.current_streams - 1).max(0);
        Ok(())
    }
}

/// Mock implementation of JobRepository for testing
#[derive(Debug, Clone)]
pub struct MockJobRepository {
    jobs: Arc<Mutex<HashMap<i64, StreamJob>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_jobs(jobs: Vec<StreamJob>) -> Self {
        let mut map = HashMap::new();
        let mut max_id = 0;
        for job in jobs {
            if job.id > max_id {
                max_id = job.id;
            }
            map.insert(job.id, job);
        }
        Self {
            jobs: Arc::new(Mutex::new(map)),
            next_id: Arc::new(Mutex::new(max_id + 1)),
        }
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl Default for MockJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn create(&self, job: &StreamJob) -> FleetResult<StreamJob> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let mut new_job = job.clone();
        if new_job.id == 0 {
            new_job.id = *next_id;
        }
        *next_id = (*next_id).max(new_job.id + 1);

        jobs.insert(new_job.id, new_job.clone());
        Ok(new_job)
    }

    async fn get_by_id(&self, job_id: i64) -> FleetResult<Option<StreamJob>> {
        Ok(self.jobs.lock().unwrap().get(&job_id).cloned())
    }

    async fn get_jobs_on_node(
        &self,
        node_id: i64,
        statuses: &[JobStatus],
    ) -> FleetResult<Vec<StreamJob>> {
        let mut jobs: Vec<StreamJob> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.vps_node_id == Some(node_id) && statuses.contains(&j.status))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs)
    }

    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> FleetResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or(FleetError::JobNotFound { id: job_id })?;
        job.status = status;
        job.error_message = error_message.map(str::to_string);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn detach_from_node(&self, job_id: i64) -> FleetResult<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or(FleetError::JobNotFound { id: job_id })?;
        job.vps_node_id = None;
        job.updated_at = Utc::now();
        Ok(())
    }
}

/// Mock implementation of AdminNotifier that records every notification
#[derive(Debug, Clone, Default)]
pub struct MockAdminNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAdminNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notification_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn last_notification(&self) -> Option<(String, String)> {
        self.messages.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AdminNotifier for MockAdminNotifier {
    async fn notify_admins(&self, subject: &str, message: &str) -> FleetResult<()> {
        self.messages
            .lock()
            .unwrap()
            .push((subject.to_string(), message.to_string()));
        Ok(())
    }
}

/// Mock implementation of RecoveryScheduler that records scheduled checks
#[derive(Debug, Clone, Default)]
pub struct MockRecoveryScheduler {
    scheduled: Arc<Mutex<Vec<(i64, Duration)>>>,
}

impl MockRecoveryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled_checks(&self) -> Vec<(i64, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }
}

#[async_trait]
impl RecoveryScheduler for MockRecoveryScheduler {
    async fn schedule_recovery_check(&self, node_id: i64, delay: Duration) -> FleetResult<()> {
        self.scheduled.lock().unwrap().push((node_id, delay));
        Ok(())
    }
}
