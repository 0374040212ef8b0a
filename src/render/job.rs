use crate::overlay::CaptionSpec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Terminal outcome of one render job. A job is resolved exactly once, by
/// its own runner invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Success,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// One isolated transcode producing one output clip for one caption.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub batch_id: String,
    /// 0-based position in the generation request
    pub index: usize,
    /// Snapshot of the caption this job renders
    pub caption: CaptionSpec,
    /// Deterministic output filename, `reel_{batchId}_{reelNumber}.mp4`
    pub output_filename: String,
    pub status: JobStatus,
}

impl RenderJob {
    /// 1-based number used in filenames and reported results
    pub fn reel_number(&self) -> usize {
        self.index + 1
    }
}

/// Lifecycle of a batch. `Completed` is reached once every job is terminal,
/// however many of them failed; partial success is a completed state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchState {
    Created,
    Running,
    Completed,
}

/// The set of render jobs derived from one generation request.
/// Membership is fixed at creation; only per-job status mutates.
#[derive(Debug, Clone)]
pub struct Batch {
    pub batch_id: String,
    pub state: BatchState,
    pub jobs: Vec<RenderJob>,
    pub created_at: SystemTime,
}

impl Batch {
    pub fn new(batch_id: String, jobs: Vec<RenderJob>) -> Self {
        Self {
            batch_id,
            state: BatchState::Created,
            jobs,
            created_at: SystemTime::now(),
        }
    }
}

/// In-memory store of batches for the lifetime of the process.
///
/// Batches are not persisted across restarts; the deterministic output
/// filenames remain the durable record the archive packager works from.
#[derive(Clone, Default)]
pub struct BatchRegistry {
    inner: Arc<Mutex<HashMap<String, Batch>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, batch: Batch) {
        let mut batches = self.inner.lock().expect("batch registry poisoned");
        batches.insert(batch.batch_id.clone(), batch);
    }

    pub fn get(&self, batch_id: &str) -> Option<Batch> {
        let batches = self.inner.lock().expect("batch registry poisoned");
        batches.get(batch_id).cloned()
    }

    pub fn set_state(&self, batch_id: &str, state: BatchState) {
        let mut batches = self.inner.lock().expect("batch registry poisoned");
        if let Some(batch) = batches.get_mut(batch_id) {
            batch.state = state;
        }
    }

    /// Record a job's terminal status. Each slot is written exactly once,
    /// by the orchestrator thread collecting that job's handle.
    pub fn resolve_job(&self, batch_id: &str, index: usize, status: JobStatus) {
        let mut batches = self.inner.lock().expect("batch registry poisoned");
        if let Some(job) = batches
            .get_mut(batch_id)
            .and_then(|batch| batch.jobs.get_mut(index))
        {
            job.status = status;
        }
    }
}
