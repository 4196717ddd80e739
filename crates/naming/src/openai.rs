//! Naming provider backed by an OpenAI-compatible chat completions API.

use crate::credential::{ApiKey, CredentialHandle};
use crate::error::{ErrorKind, Result};
use crate::mode::NamingMode;
use crate::provider::{NameProvider, NameRequest};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use exn::{OptionExt, ResultExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You rename files. Given a file's current name and its content, reply with one short, \
    descriptive file name that keeps the original extension. Reply with the file name only.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Asks an OpenAI-compatible `/chat/completions` endpoint for file names.
///
/// The API key is read from the shared [`CredentialStore`](crate::CredentialStore)
/// on every call, so a key stored after startup is picked up immediately.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    model: String,
    credentials: CredentialHandle,
    max_content_bytes: usize,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        credentials: CredentialHandle,
        max_content_bytes: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("renamer/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url, model: model.into(), credentials, max_content_bytes })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn user_message(&self, request: &NameRequest<'_>) -> ChatMessage {
        let intro = format!("Current file name: {}", request.original_name);
        let content = match request.mode {
            NamingMode::Text => MessageContent::Text(format!("{intro}\n\n{}", self.excerpt(request.content))),
            NamingMode::Image => MessageContent::Parts(vec![
                ContentPart::Text { text: intro },
                ContentPart::ImageUrl { image_url: ImageUrl { url: data_url(request.original_name, request.content) } },
            ]),
        };
        ChatMessage { role: "user", content }
    }

    fn excerpt(&self, content: &[u8]) -> String {
        let head = &content[..content.len().min(self.max_content_bytes)];
        if head.is_empty() {
            "The file is empty.".to_string()
        } else if head.contains(&0) {
            format!("The file is binary ({} bytes).", content.len())
        } else {
            format!("Content excerpt:\n{}", String::from_utf8_lossy(head))
        }
    }
}

fn image_mime(original_name: &str) -> &'static str {
    let extension = Path::new(original_name).extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("tif" | "tiff") => "image/tiff",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

fn data_url(original_name: &str, content: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime(original_name), BASE64.encode(content))
}

fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::Unavailable,
        s if s.is_server_error() => ErrorKind::Unavailable,
        s => ErrorKind::Rejected(s.as_u16()),
    }
}

#[async_trait]
impl NameProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip_all, fields(file = request.original_name, mode = %request.mode))]
    async fn propose(&self, request: NameRequest<'_>) -> Result<String> {
        let api_key = self.credentials.api_key().ok_or_raise(|| ErrorKind::MissingCredential)?;
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: MessageContent::Text(SYSTEM_PROMPT.to_string()) },
                self.user_message(&request),
            ],
            temperature: 0.2,
        };
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        let status = response.status();
        if !status.is_success() {
            debug!(%status, "naming request refused");
            exn::bail!(classify_status(status));
        }
        let parsed: ChatResponse = response.json().await.or_raise(|| ErrorKind::InvalidResponse)?;
        let proposal = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_raise(|| ErrorKind::InvalidResponse)?;
        debug!(proposal = %proposal, "naming service replied");
        Ok(proposal)
    }

    #[instrument(skip_all)]
    async fn verify(&self, api_key: &ApiKey) -> Result<()> {
        if api_key.is_empty() {
            exn::bail!(ErrorKind::Unauthorized);
        }
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(api_key.expose())
            .send()
            .await
            .or_raise(|| ErrorKind::Unavailable)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(classify_status(status));
        }
        Ok(())
    }
}
