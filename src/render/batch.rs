use crate::overlay::CaptionSpec;
use crate::render::cmd::EncoderSpawner;
use crate::render::job::{Batch, BatchRegistry, BatchState, JobStatus, RenderJob};
use crate::render::runner::render_caption;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Request-level rejection: no batch id is assigned and no job starts.
#[derive(Debug)]
pub enum BatchError {
    /// The referenced source video does not exist in the upload directory
    SourceNotFound(String),
    /// A batch needs at least one caption
    EmptyCaptionList,
    Io(io::Error),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::SourceNotFound(name) => write!(f, "source video not found: {}", name),
            BatchError::EmptyCaptionList => write!(f, "caption list is empty"),
            BatchError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BatchError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BatchError {
    fn from(err: io::Error) -> Self {
        BatchError::Io(err)
    }
}

/// Drives a batch from caption list to fully-resolved jobs.
///
/// Jobs are dispatched onto the runtime gated by a semaphore; width 1 renders
/// a batch strictly sequentially, wider pools bound the number of concurrent
/// encoder processes. Results are collected by awaiting handles in input
/// order, so reported order never depends on completion order.
pub struct BatchOrchestrator<E> {
    spawner: Arc<E>,
    registry: BatchRegistry,
    upload_dir: PathBuf,
    output_dir: PathBuf,
    workers: usize,
    timeout_secs: u64,
}

impl<E> BatchOrchestrator<E>
where
    E: EncoderSpawner + 'static,
{
    pub fn new(
        spawner: Arc<E>,
        registry: BatchRegistry,
        upload_dir: PathBuf,
        output_dir: PathBuf,
        workers: usize,
        timeout_secs: u64,
    ) -> Self {
        Self {
            spawner,
            registry,
            upload_dir,
            output_dir,
            workers: workers.max(1),
            timeout_secs,
        }
    }

    /// Run one generation request to completion.
    ///
    /// Preconditions are validated before the batch id is generated, so a
    /// rejected request leaves no trace. After dispatch the batch always runs
    /// to completion: individual job failures are recorded on their own slot
    /// and never abort siblings or the batch.
    pub async fn generate(
        &self,
        video_filename: &str,
        captions: Vec<CaptionSpec>,
    ) -> Result<Batch, BatchError> {
        if captions.is_empty() {
            return Err(BatchError::EmptyCaptionList);
        }
        let source_path = self.upload_dir.join(video_filename);
        match tokio::fs::metadata(&source_path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(BatchError::SourceNotFound(video_filename.to_string())),
        }
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let batch_id = Uuid::new_v4().to_string();
        let jobs: Vec<RenderJob> = captions
            .into_iter()
            .enumerate()
            .map(|(index, caption)| RenderJob {
                batch_id: batch_id.clone(),
                index,
                output_filename: format!("reel_{}_{}.mp4", batch_id, index + 1),
                caption,
                status: JobStatus::Pending,
            })
            .collect();

        tracing::info!(batch_id = %batch_id, jobs = jobs.len(), "starting batch");
        self.registry.insert(Batch::new(batch_id.clone(), jobs.clone()));
        self.registry.set_state(&batch_id, BatchState::Running);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let spawner = Arc::clone(&self.spawner);
            let semaphore = Arc::clone(&semaphore);
            let source_path = source_path.clone();
            let output_path = self.output_dir.join(&job.output_filename);
            let caption = job.caption.clone();
            let timeout_secs = self.timeout_secs;

            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return JobStatus::Failed(String::from("render pool closed")),
                };
                match render_caption(
                    spawner.as_ref(),
                    &source_path,
                    &caption,
                    &output_path,
                    timeout_secs,
                )
                .await
                {
                    Ok(()) => JobStatus::Success,
                    Err(e) => JobStatus::Failed(e.to_string()),
                }
            }));
        }

        // Await in input order; a crashed task resolves only its own slot.
        let mut resolved = jobs;
        for (index, handle) in handles.into_iter().enumerate() {
            let status = match handle.await {
                Ok(status) => status,
                Err(join_err) => JobStatus::Failed(format!("render task crashed: {}", join_err)),
            };
            match &status {
                JobStatus::Success => {
                    tracing::info!(batch_id = %batch_id, reel = index + 1, "reel rendered")
                }
                JobStatus::Failed(message) => {
                    tracing::error!(batch_id = %batch_id, reel = index + 1, error = %message, "reel failed")
                }
                JobStatus::Pending => {}
            }
            self.registry.resolve_job(&batch_id, index, status.clone());
            resolved[index].status = status;
        }

        self.registry.set_state(&batch_id, BatchState::Completed);
        let mut batch = Batch::new(batch_id, resolved);
        batch.state = BatchState::Completed;
        Ok(batch)
    }
}
