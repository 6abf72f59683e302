// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! In-process run lifecycle
//!
//! `JobQueue` runs pipeline batches on the rayon pool and tracks each one
//! through `Queued -> Running -> Succeeded | Failed`. Callers poll with
//! [`JobQueue::status`] or block with [`JobQueue::wait`], then take the
//! artifacts with [`JobQueue::fetch`].

use crate::config::PipelineOptions;
use crate::error::{ErrorKind, PipelineError, PipelineResult};
use crate::footprint::Footprint;
use crate::pipeline::{Pipeline, PipelineOutput};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use thiserror::Error;
use tracing::{error, info, warn};

/// Opaque job handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed { kind: ErrorKind, message: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed { .. })
    }
}

/// Status plus timestamps for one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub id: JobId,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("{id} has not finished yet")]
    NotFinished { id: JobId },

    #[error("{id} failed ({kind}): {message}")]
    Failed {
        id: JobId,
        kind: ErrorKind,
        message: String,
    },
}

struct JobRecord {
    info: JobInfo,
    output: Option<Arc<PipelineOutput>>,
}

/// Tracks pipeline runs submitted for background execution
#[derive(Clone, Default)]
pub struct JobQueue {
    jobs: Arc<DashMap<JobId, JobRecord>>,
    next_id: Arc<AtomicU64>,
    finished: Arc<(Mutex<()>, Condvar)>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a run and return immediately
    pub fn submit(&self, footprints: Vec<Footprint>, options: PipelineOptions) -> JobId {
        self.submit_task(move || Pipeline::new(options)?.run(&footprints))
    }

    pub(crate) fn submit_task<F>(&self, task: F) -> JobId
    where
        F: FnOnce() -> PipelineResult<PipelineOutput> + Send + 'static,
    {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.jobs.insert(
            id,
            JobRecord {
                info: JobInfo {
                    id,
                    status: JobStatus::Queued,
                    submitted_at: Utc::now(),
                    started_at: None,
                    finished_at: None,
                },
                output: None,
            },
        );
        info!(%id, "job queued");

        let queue = self.clone();
        rayon::spawn(move || queue.execute(id, task));
        id
    }

    fn execute<F>(&self, id: JobId, task: F)
    where
        F: FnOnce() -> PipelineResult<PipelineOutput>,
    {
        self.update(id, |record| {
            record.info.status = JobStatus::Running;
            record.info.started_at = Some(Utc::now());
        });
        info!(%id, "job running");

        let result = match catch_unwind(AssertUnwindSafe(task)) {
            Ok(result) => result,
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(%id, panic = %detail, "job panicked");
                Err(PipelineError::Internal(detail))
            }
        };

        let (status, output) = match result {
            Ok(output) => {
                info!(%id, artifacts = output.artifacts.len(), "job succeeded");
                (JobStatus::Succeeded, Some(Arc::new(output)))
            }
            Err(err) => {
                let kind = err.kind();
                let message = match &err {
                    PipelineError::Internal(detail) => {
                        error!(%id, detail = %detail, "job failed with internal error");
                        "internal error".to_string()
                    }
                    other => {
                        warn!(%id, error = %other, "job failed");
                        other.to_string()
                    }
                };
                (JobStatus::Failed { kind, message }, None)
            }
        };

        self.update(id, |record| {
            record.info.status = status;
            record.info.finished_at = Some(Utc::now());
            record.output = output;
        });

        let (lock, signal) = &*self.finished;
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        signal.notify_all();
    }

    fn update(&self, id: JobId, f: impl FnOnce(&mut JobRecord)) {
        if let Some(mut record) = self.jobs.get_mut(&id) {
            f(&mut record);
        }
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.get(&id).map(|r| r.info.status.clone())
    }

    pub fn info(&self, id: JobId) -> Option<JobInfo> {
        self.jobs.get(&id).map(|r| r.info.clone())
    }

    /// Output of a succeeded job
    pub fn fetch(&self, id: JobId) -> Result<Arc<PipelineOutput>, FetchError> {
        let record = self.jobs.get(&id).ok_or(FetchError::UnknownJob(id))?;
        match (&record.info.status, &record.output) {
            (JobStatus::Succeeded, Some(output)) => Ok(Arc::clone(output)),
            (JobStatus::Failed { kind, message }, _) => Err(FetchError::Failed {
                id,
                kind: *kind,
                message: message.clone(),
            }),
            _ => Err(FetchError::NotFinished { id }),
        }
    }

    /// Block until the job has finished and return its final status
    pub fn wait(&self, id: JobId) -> Result<JobStatus, FetchError> {
        let (lock, signal) = &*self.finished;
        let mut guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let status = self.status(id).ok_or(FetchError::UnknownJob(id))?;
            if status.is_finished() {
                return Ok(status);
            }
            guard = signal.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Drop a finished job and its artifacts. Returns false for unknown or
    /// unfinished jobs.
    pub fn remove(&self, id: JobId) -> bool {
        self.jobs
            .remove_if(&id, |_, record| record.info.status.is_finished())
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue").field("jobs", &self.jobs.len()).finish()
    }
}
