use super::AppState;
use super::error::ApiError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use renamer_engine::{FileEntry, JobState, NamingMode, Progress, parse_mode};
use renamer_naming::error::ErrorKind as NamingErrorKind;
use renamer_naming::{ApiKey, CredentialGate, verify_and_store};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const UPLOAD_FIELD: &str = "files";

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

#[derive(Deserialize)]
pub struct SetModeRequest {
    pub mode: String,
}

#[derive(Serialize)]
pub struct ModeResponse {
    pub mode: NamingMode,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub started: bool,
    pub total: usize,
}

#[derive(Serialize)]
pub struct StopResponse {
    pub stopping: bool,
}

/// Wire shape of a [`Progress`] snapshot.
///
/// `stopped` is also set for failed jobs: both mean "finished without
/// names", which is what a poller needs to stop. `failed` and `error` tell
/// them apart.
#[derive(Serialize)]
pub struct ProgressResponse {
    pub state: JobState,
    pub current: usize,
    pub total: usize,
    pub completed: bool,
    pub stopped: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    pub failures: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub poll_interval_ms: u64,
}

impl ProgressResponse {
    fn new(progress: Progress, poll_interval_ms: u64) -> Self {
        Self {
            state: progress.state,
            current: progress.current,
            total: progress.total,
            completed: progress.is_completed(),
            stopped: progress.is_stopped() || progress.is_failed(),
            failed: progress.is_failed(),
            files: progress.files,
            failures: progress.failures,
            error: progress.error,
            poll_interval_ms,
        }
    }
}

#[derive(Deserialize)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

#[derive(Serialize)]
pub struct ApiKeyResponse {
    pub valid: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiKeyStatus {
    pub has_key: bool,
}

pub async fn add_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FilesResponse>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "ignoring form field");
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await?;
        files.push((name, content.to_vec()));
    }
    let added = files.len();
    let names = state.session.add_files(files).await?;
    info!(added, staged = names.len(), "files added");
    Ok(Json(FilesResponse { files: names }))
}

pub async fn list_files(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    Json(state.session.files().await)
}

pub async fn clear_files(State(state): State<AppState>) -> StatusCode {
    let removed = state.session.clear().await;
    info!(removed, "staged files cleared");
    StatusCode::NO_CONTENT
}

pub async fn set_mode(
    State(state): State<AppState>,
    payload: Result<Json<SetModeRequest>, JsonRejection>,
) -> Result<Json<ModeResponse>, ApiError> {
    let Json(request) = payload?;
    let mode = parse_mode(&request.mode)?;
    state.session.set_mode(mode)?;
    Ok(Json(ModeResponse { mode }))
}

pub async fn start_rename(State(state): State<AppState>) -> Result<Json<StartResponse>, ApiError> {
    state.session.start().await?;
    Ok(Json(StartResponse { started: true, total: state.session.status().total }))
}

pub async fn stop_rename(State(state): State<AppState>) -> Json<StopResponse> {
    Json(StopResponse { stopping: state.session.cancel() })
}

pub async fn rename_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    Json(ProgressResponse::new(state.session.status(), state.poll_interval_ms))
}

pub async fn create_zip(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let archive = state.session.export().await?;
    let format = state.session.archive_format();
    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", state.archive_name)),
    ];
    Ok((headers, archive))
}

pub async fn store_api_key(
    State(state): State<AppState>,
    payload: Result<Json<ApiKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiKeyResponse>), ApiError> {
    let Json(request) = payload?;
    let key = ApiKey::new(request.api_key);
    if key.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiKeyResponse { valid: false, message: "API key must not be empty".to_string() }),
        ));
    }
    let response = match verify_and_store(state.provider.as_ref(), &state.credentials, key).await {
        Ok(()) => (StatusCode::OK, Json(ApiKeyResponse { valid: true, message: "API key is valid".to_string() })),
        Err(err) => {
            let status = match &*err {
                NamingErrorKind::Unauthorized | NamingErrorKind::Rejected(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Json(ApiKeyResponse { valid: false, message: (*err).to_string() }))
        },
    };
    Ok(response)
}

pub async fn api_key_status(State(state): State<AppState>) -> Json<ApiKeyStatus> {
    Json(ApiKeyStatus { has_key: state.credentials.is_configured() })
}

/// Jobs already running keep going; the next `start_rename` needs a new key.
pub async fn forget_api_key(State(state): State<AppState>) -> StatusCode {
    state.credentials.forget();
    info!("API key forgotten");
    StatusCode::NO_CONTENT
}
