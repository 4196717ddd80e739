//! HTTP surface.
//!
//! | Route                   | Method      | Purpose                                   |
//! |-------------------------|-------------|-------------------------------------------|
//! | `/add_files`            | POST        | stage multipart `files`                   |
//! | `/files`                | GET         | list staged entries                       |
//! | `/clear_selected_files` | DELETE      | stop any job, drop everything staged      |
//! | `/set_mode`             | POST        | `{"mode": "text" \| "image"}`             |
//! | `/start_rename`         | POST        | accept a job, returns immediately         |
//! | `/stop_rename`          | POST        | request cancellation                      |
//! | `/rename_progress`      | GET         | progress snapshot to poll                 |
//! | `/create_zip`           | POST, GET   | download the renamed batch                |
//! | `/api_key`              | POST, GET   | verify and store a key / whether one is set |
//! | `/api_key`              | DELETE      | forget the stored key                     |

mod error;
mod routes;

use crate::error::{ErrorKind, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use exn::ResultExt;
use renamer_engine::Session;
use renamer_naming::{CredentialHandle, ProviderHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub credentials: CredentialHandle,
    pub provider: ProviderHandle,
    /// File name offered for the archive download.
    pub archive_name: String,
    pub poll_interval_ms: u64,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/add_files", post(routes::add_files))
        .route("/files", get(routes::list_files))
        .route("/clear_selected_files", delete(routes::clear_files))
        .route("/set_mode", post(routes::set_mode))
        .route("/start_rename", post(routes::start_rename))
        .route("/stop_rename", post(routes::stop_rename))
        .route("/rename_progress", get(routes::rename_progress))
        .route("/create_zip", post(routes::create_zip).get(routes::create_zip))
        .route(
            "/api_key",
            post(routes::store_api_key).get(routes::api_key_status).delete(routes::forget_api_key),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Serve until Ctrl-C, then stop any running job and drop staged content.
pub async fn serve(state: AppState, bind: SocketAddr, max_upload_bytes: usize) -> Result<()> {
    let listener = TcpListener::bind(bind).await.or_raise(|| ErrorKind::Server)?;
    let address = listener.local_addr().or_raise(|| ErrorKind::Server)?;
    info!(%address, "listening");
    let session = Arc::clone(&state.session);
    axum::serve(listener, router(state, max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .or_raise(|| ErrorKind::Server)?;
    let removed = session.clear().await;
    info!(removed, "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server just runs until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use renamer_archive::ArchiveFormat;
    use renamer_engine::{JobSettings, RenameJob, StagingStore};
    use renamer_naming::{ApiKey, CredentialStore, ScriptedProvider};
    use renamer_storage::backend::MemoryBackend;
    use serde_json::{Value, json};
    use std::io::{Cursor, Read};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tower::ServiceExt;

    const BOUNDARY: &str = "renamer-test-boundary";

    fn app(provider: ScriptedProvider, with_key: bool) -> Router {
        let credentials = Arc::new(CredentialStore::new());
        if with_key {
            credentials.store_validated(ApiKey::new("sk-test"));
        }
        let provider: ProviderHandle = Arc::new(provider);
        let job = RenameJob::new(Arc::clone(&provider), credentials.clone(), JobSettings::default());
        let session = Session::new(StagingStore::new(Arc::new(MemoryBackend::default())), job, ArchiveFormat::Zip);
        let state = AppState {
            session: Arc::new(session),
            credentials,
            provider,
            archive_name: "renamed_files.zip".to_string(),
            poll_interval_ms: 500,
        };
        router(state, 1024 * 1024)
    }

    fn upload(files: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, content) in files {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                 Content-Type: text/plain\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::post("/add_files")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri).header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn poll_until_done(app: &Router) -> Value {
        for _ in 0..1000 {
            let (_, progress) = send_json(app, get("/rename_progress")).await;
            if progress["completed"] == json!(true) || progress["stopped"] == json!(true) {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never finished");
    }

    #[tokio::test]
    async fn test_full_flow() {
        let app = app(ScriptedProvider::default(), true);

        let (status, body) = send_json(&app, upload(&[("a.txt", "alpha"), ("b.txt", "bravo")])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"files": ["a.txt", "b.txt"]}));
        let (_, body) = send_json(&app, upload(&[("c.txt", "charlie")])).await;
        assert_eq!(body, json!({"files": ["a.txt", "b.txt", "c.txt"]}));

        let (status, body) = send_json(&app, post_json("/set_mode", json!({"mode": "text"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"mode": "text"}));

        let (status, body) = send_json(&app, post("/start_rename")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"started": true, "total": 3}));

        let progress = poll_until_done(&app).await;
        assert_eq!(progress["current"], 3);
        assert_eq!(progress["total"], 3);
        assert_eq!(progress["state"], "completed");
        assert_eq!(progress["files"], json!(["A.txt", "B.txt", "C.txt"]));
        assert_eq!(progress["poll_interval_ms"], 500);

        let response = app.clone().oneshot(post("/create_zip")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(response.headers()[header::CONTENT_DISPOSITION], "attachment; filename=\"renamed_files.zip\"");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).unwrap();
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            entries.push((file.name().to_string(), content));
        }
        assert_eq!(
            entries,
            [
                ("A.txt".to_string(), "alpha".to_string()),
                ("B.txt".to_string(), "bravo".to_string()),
                ("C.txt".to_string(), "charlie".to_string()),
            ]
        );

        let (_, files) = send_json(&app, get("/files")).await;
        assert_eq!(files[0]["index"], 1);
        assert_eq!(files[0]["original_name"], "a.txt");
        assert_eq!(files[0]["renamed_name"], "A.txt");
        assert_eq!(files[0]["failed"], false);
    }

    #[tokio::test]
    async fn test_start_without_files() {
        let app = app(ScriptedProvider::default(), true);
        let (status, body) = send_json(&app, post("/start_rename")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "no files staged"}));
    }

    #[tokio::test]
    async fn test_start_without_key() {
        let app = app(ScriptedProvider::default(), false);
        send(&app, upload(&[("a.txt", "alpha")])).await;
        let (status, body) = send_json(&app, post("/start_rename")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "no API key configured for the naming service");
    }

    #[tokio::test]
    async fn test_invalid_mode() {
        let app = app(ScriptedProvider::default(), true);
        let (status, body) = send_json(&app, post_json("/set_mode", json!({"mode": "audio"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("audio"));

        let (status, body) = send_json(&app, post_json("/set_mode", json!({"nope": true}))).await;
        assert!(status.is_client_error());
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_conflicts_while_running() {
        let gate = Arc::new(Semaphore::new(0));
        let app = app(ScriptedProvider::default().gated(gate.clone()), true);
        send(&app, upload(&[("a.txt", "alpha"), ("b.txt", "bravo")])).await;
        let (status, _) = send(&app, post("/start_rename")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(&app, post("/start_rename")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "a rename job is already running");
        let (status, _) = send(&app, post_json("/set_mode", json!({"mode": "image"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&app, post("/create_zip")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, progress) = send_json(&app, get("/rename_progress")).await;
        assert_eq!(progress["state"], "running");
        assert_eq!(progress["completed"], false);
        assert!(progress.get("files").is_none());

        gate.add_permits(2);
        assert_eq!(poll_until_done(&app).await["completed"], true);
    }

    #[tokio::test]
    async fn test_stop_rename() {
        let gate = Arc::new(Semaphore::new(0));
        let app = app(ScriptedProvider::default().gated(gate.clone()), true);
        send(&app, upload(&[("a.txt", "alpha"), ("b.txt", "bravo")])).await;
        send(&app, post("/start_rename")).await;

        let (_, body) = send_json(&app, post("/stop_rename")).await;
        assert_eq!(body, json!({"stopping": true}));
        gate.add_permits(2);

        let progress = poll_until_done(&app).await;
        assert_eq!(progress["stopped"], true);
        assert_eq!(progress["failed"], false);
        assert_eq!(progress["completed"], false);
        let (status, _) = send(&app, post("/create_zip")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send_json(&app, post("/stop_rename")).await;
        assert_eq!(body, json!({"stopping": false}));
    }

    #[tokio::test]
    async fn test_failed_job_reports_error() {
        use renamer_naming::error::ErrorKind as NamingErrorKind;
        let app = app(ScriptedProvider::failing(NamingErrorKind::Unauthorized), true);
        send(&app, upload(&[("a.txt", "alpha")])).await;
        send(&app, post("/start_rename")).await;

        let progress = poll_until_done(&app).await;
        assert_eq!(progress["state"], "failed");
        assert_eq!(progress["stopped"], true);
        assert_eq!(progress["failed"], true);
        assert!(progress["error"].as_str().unwrap().contains("rejected the API key"));
    }

    #[tokio::test]
    async fn test_clear() {
        let app = app(ScriptedProvider::default(), true);
        send(&app, upload(&[("a.txt", "alpha")])).await;
        let (status, body) = send(&app, Request::delete("/clear_selected_files").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        let (_, files) = send_json(&app, get("/files")).await;
        assert_eq!(files, json!([]));
    }

    #[tokio::test]
    async fn test_api_key() {
        let app = app(ScriptedProvider::default().accepting("sk-good"), false);
        let (_, body) = send_json(&app, get("/api_key")).await;
        assert_eq!(body, json!({"has_key": false}));

        let (status, body) = send_json(&app, post_json("/api_key", json!({"api_key": "sk-bad"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["valid"], false);

        let (status, body) = send_json(&app, post_json("/api_key", json!({"api_key": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"valid": false, "message": "API key must not be empty"}));

        let (status, body) = send_json(&app, post_json("/api_key", json!({"api_key": "sk-good"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"valid": true, "message": "API key is valid"}));
        let (_, body) = send_json(&app, get("/api_key")).await;
        assert_eq!(body, json!({"has_key": true}));
    }

    #[tokio::test]
    async fn test_forget_api_key() {
        let app = app(ScriptedProvider::default(), true);
        let (status, body) = send(&app, Request::delete("/api_key").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        let (_, body) = send_json(&app, get("/api_key")).await;
        assert_eq!(body, json!({"has_key": false}));

        send(&app, upload(&[("a.txt", "alpha")])).await;
        let (status, body) = send_json(&app, post("/start_rename")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }
}
