//! Server configuration loaded from the environment.

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the reel rendering service.
#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Directory where uploaded source videos are stored
    pub upload_dir: PathBuf,
    /// Directory where rendered reels are written
    pub output_dir: PathBuf,
    /// Maximum number of concurrent encoder processes per batch.
    /// 1 renders a batch strictly sequentially.
    pub render_workers: usize,
    /// Seconds after which a hung encoder process is killed
    pub render_timeout_secs: u64,
    /// Serve the HTML test page at `/`
    pub is_test: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3001")),
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| String::from("./uploads")),
            ),
            output_dir: PathBuf::from(
                env::var("OUTPUT_DIR").unwrap_or_else(|_| String::from("./output")),
            ),
            render_workers: env::var("RENDER_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(1),
            render_timeout_secs: env::var("RENDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            is_test: env::var("IS_TEST")
                .unwrap_or_else(|_| String::from("true"))
                .parse()
                .unwrap_or(true),
        }
    }
}
