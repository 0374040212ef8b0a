use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use std::error::Error;
use std::fmt;

/// Archive filename for a batch, `reels_batch_{batchId}.zip`.
pub fn archive_name(batch_id: &str) -> String {
    format!("reels_batch_{}.zip", batch_id)
}

#[derive(Debug)]
pub enum ArchiveError {
    /// The output directory holds no clip belonging to this batch
    NotFound(String),
    Io(io::Error),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::NotFound(batch_id) => {
                write!(f, "no rendered clips found for batch {}", batch_id)
            }
            ArchiveError::Io(e) => write!(f, "archive packaging failed: {}", e),
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArchiveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        ArchiveError::Io(e)
    }
}

/// Clips in `output_dir` belonging to `batch_id`, sorted by filename.
///
/// Membership is decided by the filename carrying the batch id, so the
/// archive reflects whatever renders have finished on disk right now.
/// Jobs still in flight are simply not part of the zip.
pub async fn batch_files(output_dir: &Path, batch_id: &str) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.contains(batch_id) && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Package every finished clip of a batch into a zip, returning an open
/// handle positioned at the start of the archive.
///
/// The zip is spooled into an anonymous temp file rather than memory, so a
/// batch of large clips never has to fit in RAM. The file is unlinked and
/// vanishes once the returned handle is dropped.
pub async fn build_batch_archive(
    output_dir: &Path,
    batch_id: &str,
) -> Result<tokio::fs::File, ArchiveError> {
    let files = batch_files(output_dir, batch_id).await?;
    if files.is_empty() {
        return Err(ArchiveError::NotFound(batch_id.to_string()));
    }

    let spool = tokio::task::spawn_blocking(move || write_archive(&files))
        .await
        .map_err(|e| ArchiveError::Io(io::Error::other(e)))??;

    Ok(tokio::fs::File::from_std(spool))
}

fn write_archive(files: &[PathBuf]) -> Result<std::fs::File, ArchiveError> {
    let spool = tempfile::tempfile()?;
    let mut zip = ZipWriter::new(spool);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        zip.start_file(name, options).map_err(zip_to_io)?;
        let mut clip = std::fs::File::open(path)?;
        io::copy(&mut clip, &mut zip)?;
    }

    let mut spool = zip.finish().map_err(zip_to_io)?;
    spool.flush()?;
    spool.seek(SeekFrom::Start(0))?;
    Ok(spool)
}

fn zip_to_io(e: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Io(io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    #[test]
    fn archive_name_embeds_batch_id() {
        assert_eq!(archive_name("abc-123"), "reels_batch_abc-123.zip");
    }

    #[tokio::test]
    async fn batch_files_selects_only_matching_clips() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("reel_A_1.mp4"), b"one").unwrap();
        std::fs::write(dir.path().join("reel_A_2.mp4"), b"two").unwrap();
        std::fs::write(dir.path().join("reel_B_1.mp4"), b"other batch").unwrap();

        let files = batch_files(dir.path(), "A").await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["reel_A_1.mp4", "reel_A_2.mp4"]);
    }

    #[tokio::test]
    async fn archive_contains_exactly_the_batch_members() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("reel_A_1.mp4"), b"first clip").unwrap();
        std::fs::write(dir.path().join("reel_A_2.mp4"), b"second clip").unwrap();
        std::fs::write(dir.path().join("reel_B_1.mp4"), b"not mine").unwrap();

        let mut archive_file = build_batch_archive(dir.path(), "A").await.unwrap();
        let mut bytes = Vec::new();
        archive_file.read_to_end(&mut bytes).await.unwrap();

        let mut archive = zip::ZipArchive::new(io::Cursor::new(bytes)).unwrap();
        let names: Vec<_> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["reel_A_1.mp4", "reel_A_2.mp4"]);

        let mut first = String::new();
        archive.by_name("reel_A_1.mp4").unwrap().read_to_string(&mut first).unwrap();
        assert_eq!(first, "first clip");
    }

    #[tokio::test]
    async fn unknown_batch_is_not_found() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("reel_A_1.mp4"), b"clip").unwrap();

        let err = build_batch_archive(dir.path(), "missing").await.unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
        assert!(err.to_string().contains("missing"));
    }
}
