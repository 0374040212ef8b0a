mod archive;
mod config;
mod overlay;
mod render;
mod upload;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::archive::{archive_name, build_batch_archive, ArchiveError};
use crate::config::Config;
use crate::overlay::CaptionSpec;
use crate::render::{
    BatchError, BatchOrchestrator, BatchRegistry, BatchState, FfmpegSpawner, JobStatus, RenderJob,
};
use crate::upload::UploadedVideo;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    orchestrator: Arc<BatchOrchestrator<FfmpegSpawner>>,
    registry: BatchRegistry,
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt::init();

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload directory");
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .expect("Failed to create output directory");

    let registry = BatchRegistry::new();
    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::new(FfmpegSpawner),
        registry.clone(),
        config.upload_dir.clone(),
        config.output_dir.clone(),
        config.render_workers,
        config.render_timeout_secs,
    ));
    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator,
        registry,
    };

    let mut router = Router::new()
        .route("/api/upload-video", post(upload_video))
        .route("/api/generate-reels", post(generate_reels))
        .route("/api/batch/:batch_id", get(batch_status))
        .route("/api/download/:filename", get(download_clip))
        .route("/api/download-batch/:batch_id", get(download_batch));

    if config.is_test {
        router = router.route("/", get(root));
    }

    let app = router
        .layer(DefaultBodyLimit::max(upload::MAX_UPLOAD_BYTES))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!(addr = %config.addr, port = %config.port, "listening");
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn json_error(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    video: UploadedVideo,
    message: String,
}

// Accepts a multipart form and stores the `video` field under a unique name.
async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ErrorBody>)> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("video") {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        if !upload::filename_is_valid(&original_name) {
            return Err(json_error(StatusCode::BAD_REQUEST, "Invalid filename"));
        }
        if !upload::is_allowed_video(&original_name) {
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                "Only video files are allowed",
            ));
        }

        let filename = upload::stored_filename(&original_name);
        let path = state.config.upload_dir.join(&filename);
        let size = upload::stream_to_file(&path, field)
            .await
            .map_err(|e| json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

        tracing::info!(filename = %filename, size, "stored source video");
        return Ok(Json(UploadResponse {
            success: true,
            video: UploadedVideo {
                id: Uuid::new_v4().to_string(),
                filename,
                original_name,
                size,
            },
            message: String::from("Video uploaded successfully"),
        }));
    }

    Err(json_error(
        StatusCode::BAD_REQUEST,
        "No video file uploaded",
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    video_filename: Option<String>,
    captions: Option<Vec<CaptionSpec>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReelResult {
    reel_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    caption: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn result_from_job(job: &RenderJob) -> ReelResult {
    match &job.status {
        JobStatus::Success => ReelResult {
            reel_number: job.reel_number(),
            filename: Some(job.output_filename.clone()),
            caption: job.caption.text.clone(),
            status: "success",
            error: None,
        },
        JobStatus::Failed(detail) => ReelResult {
            reel_number: job.reel_number(),
            filename: None,
            caption: job.caption.text.clone(),
            status: "error",
            error: Some(detail.clone()),
        },
        JobStatus::Pending => ReelResult {
            reel_number: job.reel_number(),
            filename: None,
            caption: job.caption.text.clone(),
            status: "pending",
            error: None,
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    batch_id: String,
    results: Vec<ReelResult>,
    download_url: String,
}

// Renders one reel per caption and reports per-reel outcomes in input order.
async fn generate_reels(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, (StatusCode, Json<ErrorBody>)> {
    let (Some(video_filename), Some(captions)) = (request.video_filename, request.captions) else {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "Video filename and captions are required",
        ));
    };
    if !upload::filename_is_valid(&video_filename) {
        return Err(json_error(StatusCode::BAD_REQUEST, "Invalid filename"));
    }

    let batch = state
        .orchestrator
        .generate(&video_filename, captions)
        .await
        .map_err(|e| match e {
            BatchError::EmptyCaptionList => json_error(
                StatusCode::BAD_REQUEST,
                "Video filename and captions are required",
            ),
            BatchError::SourceNotFound(_) => {
                json_error(StatusCode::NOT_FOUND, "Video file not found")
            }
            BatchError::Io(_) => json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate reels",
            ),
        })?;

    let results: Vec<ReelResult> = batch.jobs.iter().map(result_from_job).collect();
    Ok(Json(GenerateResponse {
        success: true,
        download_url: format!("/api/download-batch/{}", batch.batch_id),
        batch_id: batch.batch_id,
        results,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchStatusResponse {
    batch_id: String,
    state: &'static str,
    results: Vec<ReelResult>,
}

fn state_label(state: BatchState) -> &'static str {
    match state {
        BatchState::Created => "created",
        BatchState::Running => "running",
        BatchState::Completed => "completed",
    }
}

async fn batch_status(
    State(state): State<AppState>,
    UrlPath(batch_id): UrlPath<String>,
) -> Result<Json<BatchStatusResponse>, (StatusCode, Json<ErrorBody>)> {
    let batch = state
        .registry
        .get(&batch_id)
        .ok_or_else(|| json_error(StatusCode::NOT_FOUND, "Batch not found"))?;

    Ok(Json(BatchStatusResponse {
        batch_id: batch.batch_id.clone(),
        state: state_label(batch.state),
        results: batch.jobs.iter().map(result_from_job).collect(),
    }))
}

async fn download_clip(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    if !upload::filename_is_valid(&filename) {
        return Err(json_error(StatusCode::BAD_REQUEST, "Invalid filename"));
    }

    let path = state.config.output_dir.join(&filename);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| json_error(StatusCode::NOT_FOUND, "File not found"))?;

    let headers = [
        (header::CONTENT_TYPE, String::from("video/mp4")),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}

// Zips whatever clips of the batch are finished on disk right now.
async fn download_batch(
    State(state): State<AppState>,
    UrlPath(batch_id): UrlPath<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let archive_file = build_batch_archive(&state.config.output_dir, &batch_id)
        .await
        .map_err(|e| match e {
            ArchiveError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "File not found"),
            ArchiveError::Io(_) => json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create batch download",
            ),
        })?;

    let headers = [
        (header::CONTENT_TYPE, String::from("application/zip")),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive_name(&batch_id)),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(archive_file))))
}

async fn root(State(state): State<AppState>) -> Html<String> {
    let files = match std::fs::read_dir(&state.config.upload_dir) {
        Ok(entries) => entries
            .filter_map(|entry| {
                entry
                    .ok()
                    .and_then(|e| e.file_name().to_str().map(String::from))
            })
            .collect::<Vec<String>>(),
        Err(_) => vec!["Error reading directory".to_string()],
    };

    let file_list = files
        .iter()
        .map(|file| format!("<li>{}</li>", file))
        .collect::<String>();

    Html(format!(
        r#"
        <!doctype html>
        <html>
            <head>
                <title>Reel captioner</title>
            </head>
            <body>
                <h1>Uploaded source videos:</h1>
                <ul>{}</ul>
                <form action="/api/upload-video" method="post" enctype="multipart/form-data">
                    <div>
                        <label>
                            Upload video:
                            <input type="file" name="video">
                        </label>
                    </div>
                    <div>
                        <input type="submit" value="Upload video">
                    </div>
                </form>
            </body>
        </html>
        "#,
        file_list
    ))
}
