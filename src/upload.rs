use axum::body::Bytes;
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::BufWriter;
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Upload size cap, 100MB.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// Metadata recorded for a stored source video.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub id: String,
    /// Name the file was stored under, `{uuid}-{originalName}`
    pub filename: String,
    pub original_name: String,
    pub size: u64,
}

/// True when the filename carries a video extension we accept.
pub fn is_allowed_video(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Unique stored name keeping the original name visible for debugging.
pub fn stored_filename(original_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), original_name)
}

/// Reject names that could escape the storage directory.
pub fn filename_is_valid(filename: &str) -> bool {
    let path = Path::new(filename);
    let mut components = path.components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

/// Save a `Stream` of body chunks to a file, returning the byte count.
pub async fn stream_to_file<S, E>(path: &PathBuf, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::new(File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;

    Ok(written)
}
