pub mod batch;
pub mod cmd;
pub mod job;
pub mod runner;

pub use batch::{BatchError, BatchOrchestrator};
pub use cmd::{EncoderSpawner, FfmpegSpawner};
pub use job::{Batch, BatchRegistry, BatchState, JobStatus, RenderJob};
