use crate::overlay::{CaptionSpec, OverlayParams};
use crate::render::cmd::EncoderSpawner;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

/// Why a single render job failed.
#[derive(Debug)]
pub enum RenderError {
    /// The encoder process could not be started
    Spawn(io::Error),
    /// The encoder exited non-zero; carries the tail of its stderr
    Encoder(String),
    /// The encoder was killed after exceeding the per-job time bound
    Timeout(u64),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Spawn(e) => write!(f, "failed to start encoder: {}", e),
            RenderError::Encoder(detail) => write!(f, "encoder failed: {}", detail),
            RenderError::Timeout(secs) => {
                write!(f, "encoder timed out after {}s and was killed", secs)
            }
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Render one caption onto the source video, producing `output_path`.
///
/// Exactly one encoder process lifecycle per call, no internal retry. On any
/// failure the partially written output is deleted before reporting, so a
/// `Failed` job never points at a usable file.
pub async fn render_caption(
    spawner: &impl EncoderSpawner,
    source_path: &Path,
    caption: &CaptionSpec,
    output_path: &Path,
    timeout_secs: u64,
) -> Result<(), RenderError> {
    let filter_chain = OverlayParams::from_caption(caption).filter_chain();

    let run = spawner.run_ffmpeg_overlay(source_path, &filter_chain, output_path);
    let output = match timeout(Duration::from_secs(timeout_secs), run).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            discard_partial_output(output_path).await;
            return Err(RenderError::Spawn(e));
        }
        Err(_) => {
            // kill_on_drop reaps the encoder when the future is dropped
            discard_partial_output(output_path).await;
            return Err(RenderError::Timeout(timeout_secs));
        }
    };

    if !output.status.success() {
        discard_partial_output(output_path).await;
        return Err(RenderError::Encoder(stderr_tail(&output.stderr)));
    }

    Ok(())
}

async fn discard_partial_output(output_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(output_path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %output_path.display(), error = %e, "could not remove partial output");
        }
    }
}

/// Last few non-empty stderr lines, oldest first. ffmpeg buries the actual
/// error at the very end of a long banner.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let mut tail: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .take(4)
        .collect();
    if tail.is_empty() {
        return String::from("encoder exited with an error");
    }
    tail.reverse();
    tail.join(" | ")
}
