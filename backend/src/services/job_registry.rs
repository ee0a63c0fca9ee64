//! Job Registry (C9).
//!
//! Grounded on `original_source/backend/api/endpoints.py`'s in-memory
//! `jobs_storage` dict and the teacher's `dashmap` usage elsewhere
//! (`baseline_cache.rs`, C4's own `QueryCache`). `DashMap`'s per-shard
//! locking satisfies §5's "exclusive mutation" requirement for C9 without
//! a single global `Mutex` serializing unrelated jobs.

use chrono::Utc;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::models::{ErrorRecord, Job, JobResult, JobStatus, Prompt};
use crate::utils::ScheduledTask;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {0} is still {1:?}; delete rejected")]
    NotTerminal(Uuid, JobStatus),
}

/// Compact view served by `GET /jobs` (§4.9): prompts truncated to 50
/// characters, no result/error payload.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct JobSummary {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub prompt: String,
    pub submitted_at: chrono::DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self { id: job.id, status: job.status, progress: job.progress, prompt: job.truncated_prompt(), submitted_at: job.submitted_at }
    }
}

/// Per-job cooperative cancellation flag, consulted between orchestrator
/// stages and at each retry boundary (§5).
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct JobRegistry {
    jobs: DashMap<Uuid, Job>,
    cancel_flags: DashMap<Uuid, CancelFlag>,
    ttl: chrono::Duration,
}

impl JobRegistry {
    pub fn new(ttl_secs: u64) -> Self {
        Self { jobs: DashMap::new(), cancel_flags: DashMap::new(), ttl: chrono::Duration::seconds(ttl_secs as i64) }
    }

    /// Creates a new job in `Pending` state, registers its cancel flag, and
    /// returns it. Submissions are ordered by registry insertion (§5); no
    /// ordering guarantee holds once jobs run in parallel.
    pub fn create(&self, prompt: Prompt) -> Job {
        let job = Job::new(prompt);
        self.cancel_flags.insert(job.id, CancelFlag::default());
        self.jobs.insert(job.id, job.clone());
        job
    }

    pub fn cancel_flag(&self, id: Uuid) -> Option<CancelFlag> {
        self.cancel_flags.get(&id).map(|f| f.clone())
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.clone())
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.jobs.iter().map(|entry| JobSummary::from(entry.value())).collect()
    }

    /// Status transitions are a monotonic prefix of pending -> processing
    /// -> {completed|failed|cancelled} (§8); this registry does not itself
    /// enforce the ordering — the orchestrator (C8), the only writer of
    /// `status`, is responsible for never calling back to an earlier one.
    pub fn set_processing(&self, id: Uuid) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.status = JobStatus::Processing;
        }
    }

    pub fn set_progress(&self, id: Uuid, progress: u8) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.progress = progress;
        }
    }

    pub fn complete(&self, id: Uuid, result: JobResult) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.result = Some(result);
            job.completed_at = Some(Utc::now());
        }
    }

    pub fn fail(&self, id: Uuid, error: ErrorRecord) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.completed_at = Some(Utc::now());
        }
    }

    pub fn cancel(&self, id: Uuid) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            if !job.is_terminal() {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(Utc::now());
            }
        }
    }

    /// Requests cancellation of a pending/processing job; a no-op (but not
    /// an error) on an already-terminal job. Returns `NotFound` if the job
    /// id is unknown.
    pub fn request_cancel(&self, id: Uuid) -> Result<(), RegistryError> {
        let job = self.jobs.get(&id).ok_or(RegistryError::NotFound(id))?;
        if job.is_terminal() {
            return Ok(());
        }
        drop(job);
        if let Some(flag) = self.cancel_flags.get(&id) {
            flag.request();
        }
        Ok(())
    }

    /// Rejects deletion of a job still in pending/processing; a job in
    /// pending/processing state cannot be deleted (§3 Job invariants).
    pub fn delete(&self, id: Uuid) -> Result<(), RegistryError> {
        let job = self.jobs.get(&id).ok_or(RegistryError::NotFound(id))?;
        if !job.is_terminal() {
            return Err(RegistryError::NotTerminal(id, job.status));
        }
        drop(job);
        self.jobs.remove(&id);
        self.cancel_flags.remove(&id);
        Ok(())
    }

    /// Evicts terminal jobs older than the registry TTL, and stuck
    /// pending/processing jobs whose `submitted_at` has aged past it.
    pub fn sweep_expired(&self) {
        let now = Utc::now();
        let ttl = self.ttl;
        let expired: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|entry| {
                let job = entry.value();
                let reference = job.completed_at.unwrap_or(job.submitted_at);
                now - reference > ttl
            })
            .map(|entry| *entry.key())
            .collect();

        for id in &expired {
            self.jobs.remove(id);
            self.cancel_flags.remove(id);
        }

        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "evicted expired jobs");
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Periodic eviction sweep, run via [`crate::utils::ScheduledExecutor`].
pub struct JobRegistrySweep {
    registry: Arc<JobRegistry>,
}

impl JobRegistrySweep {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }
}

impl ScheduledTask for JobRegistrySweep {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move {
            self.registry.sweep_expired();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt::new("show revenue by region")
    }

    #[test]
    fn create_starts_pending_and_is_listed() {
        let registry = JobRegistry::new(3600);
        let job = registry.create(prompt());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn delete_rejected_while_processing() {
        let registry = JobRegistry::new(3600);
        let job = registry.create(prompt());
        registry.set_processing(job.id);
        assert!(matches!(registry.delete(job.id), Err(RegistryError::NotTerminal(_, _))));
    }

    #[test]
    fn delete_succeeds_once_terminal_then_get_returns_none() {
        let registry = JobRegistry::new(3600);
        let job = registry.create(prompt());
        registry.complete(job.id, JobResult { artifact_code: "x".to_string(), component_name: "X".to_string(), chart_type: "bar".to_string(), cache_hit: false });
        assert!(registry.delete(job.id).is_ok());
        assert!(registry.get(job.id).is_none());
    }

    #[test]
    fn delete_unknown_job_is_not_found() {
        let registry = JobRegistry::new(3600);
        assert!(matches!(registry.delete(Uuid::new_v4()), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn cancel_flag_propagates() {
        let registry = JobRegistry::new(3600);
        let job = registry.create(prompt());
        registry.request_cancel(job.id).unwrap();
        assert!(registry.cancel_flag(job.id).unwrap().is_requested());
    }

    #[test]
    fn sweep_evicts_old_completed_jobs() {
        let registry = JobRegistry::new(0);
        let job = registry.create(prompt());
        registry.complete(job.id, JobResult { artifact_code: "x".to_string(), component_name: "X".to_string(), chart_type: "bar".to_string(), cache_hit: false });
        registry.sweep_expired();
        assert!(registry.is_empty());
    }
}
