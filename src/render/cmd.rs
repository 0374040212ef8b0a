use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;
use tokio::process::Command as TokioCommand;

/// Executes one overlay transcode as an external encoder process.
///
/// Modeled as a capability so the orchestrator and runner are testable
/// without a real ffmpeg binary on the machine.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait EncoderSpawner: Send + Sync {
    async fn run_ffmpeg_overlay(
        &self,
        source_path: &Path,
        filter_chain: &str,
        output_path: &Path,
    ) -> io::Result<Output>;
}

/// Spawns the real ffmpeg CLI.
pub struct FfmpegSpawner;

#[async_trait]
impl EncoderSpawner for FfmpegSpawner {
    async fn run_ffmpeg_overlay(
        &self,
        source_path: &Path,
        filter_chain: &str,
        output_path: &Path,
    ) -> io::Result<Output> {
        // Video is re-encoded at a fixed quality/speed tradeoff for
        // predictable batch turnaround; audio is copied untouched.
        TokioCommand::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(source_path)
            .arg("-vf")
            .arg(filter_chain)
            .arg("-c:a")
            .arg("copy")
            .arg("-preset")
            .arg("fast")
            .arg("-crf")
            .arg("23")
            .arg(output_path)
            .kill_on_drop(true)
            .output()
            .await
    }
}
