// reqwest-backed Bot API client

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::config::environment::EnvironmentVariables;
use crate::telegram::types::{ApiResponse, File, Message, Update, User};
use crate::telegram::{BotApi, SendVideo, TelegramError, VideoInput};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
// ! Uploads can be large; the Bot API accepts up to 50MB
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);
// * Extra slack on top of the long-poll timeout
const POLL_SLACK: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    method_base: String,
    file_base: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TelegramError> {
        let http: Client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(TelegramError::transport)?;

        let api_url: &str = api_url.trim_end_matches('/');

        Ok(Self {
            http,
            method_base: format!("{api_url}/bot{token}"),
            file_base: format!("{api_url}/file/bot{token}"),
        })
    }

    pub fn from_env(env: &EnvironmentVariables) -> Result<Self, TelegramError> {
        Self::new(&env.telegram_api_url, &env.bot_token)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.method_base, method)
    }

    /// Sends a prepared request and unwraps the `{ok, result}` envelope
    async fn call<T: DeserializeOwned>(&self, method: &str, request: RequestBuilder) -> Result<T, TelegramError> {
        debug!(method, "Calling Bot API");

        let response: reqwest::Response = request.send().await.map_err(TelegramError::transport)?;
        let status: reqwest::StatusCode = response.status();
        let body = response.bytes().await.map_err(TelegramError::transport)?;

        let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e: serde_json::Error| {
            TelegramError::Decode(format!("{method} returned {status}: {e}"))
        })?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.unwrap_or_else(|| i32::from(status.as_u16())),
                description: envelope.description.unwrap_or_else(|| "unknown error".to_string()),
                retry_after: envelope.parameters.and_then(|p| p.retry_after),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{method} returned no result")))
    }

    async fn call_json<T: DeserializeOwned>(&self, method: &str, payload: Value) -> Result<T, TelegramError> {
        let request: RequestBuilder = self
            .http
            .post(self.method_url(method))
            .timeout(REQUEST_TIMEOUT)
            .json(&payload);

        self.call(method, request).await
    }
}

fn file_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> Result<Part, TelegramError> {
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(TelegramError::transport)
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_me(&self) -> Result<User, TelegramError> {
        self.call_json("getMe", json!({})).await
    }

    async fn delete_webhook(&self) -> Result<(), TelegramError> {
        let _: bool = self
            .call_json("deleteWebhook", json!({ "drop_pending_updates": false }))
            .await?;
        Ok(())
    }

    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let mut payload: Value = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }

        let request: RequestBuilder = self
            .http
            .post(self.method_url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs) + POLL_SLACK)
            .json(&payload);

        self.call("getUpdates", request).await
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.call_json("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), TelegramError> {
        // ? The result is either the edited Message or `true`
        let _: Value = self
            .call_json(
                "editMessageText",
                json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, dest_stem))]
    async fn download_file(&self, file_id: &str, dest_stem: &Path) -> Result<PathBuf, TelegramError> {
        let file: File = self.call_json("getFile", json!({ "file_id": file_id })).await?;
        let remote_path: String = file
            .file_path
            .ok_or_else(|| TelegramError::Decode("getFile returned no file_path".to_string()))?;

        let dest: PathBuf = match Path::new(&remote_path).extension() {
            Some(ext) => dest_stem.with_extension(ext),
            None => dest_stem.to_path_buf(),
        };

        let mut response: reqwest::Response = self
            .http
            .get(format!("{}/{}", self.file_base, remote_path))
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(TelegramError::transport)?;

        if !response.status().is_success() {
            return Err(TelegramError::Api {
                code: i32::from(response.status().as_u16()),
                description: "file download failed".to_string(),
                retry_after: None,
            });
        }

        let mut out: tokio::fs::File = tokio::fs::File::create(&dest).await?;
        while let Some(chunk) = response.chunk().await.map_err(TelegramError::transport)? {
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        debug!(path = %dest.display(), "Downloaded file");
        Ok(dest)
    }

    #[instrument(skip(self, request), fields(chat_id = request.chat_id))]
    async fn send_video(&self, request: SendVideo) -> Result<Message, TelegramError> {
        let thumb_bytes: Vec<u8> = tokio::fs::read(&request.thumbnail).await?;

        let mut form: Form = Form::new()
            .text("chat_id", request.chat_id.to_string())
            .text("duration", request.duration.to_string())
            .text("width", request.width.to_string())
            .text("height", request.height.to_string())
            .text("supports_streaming", request.supports_streaming.to_string())
            .part("thumbnail", file_part(thumb_bytes, "thumb.jpg", "image/jpeg")?);

        if !request.caption.is_empty() {
            form = form.text("caption", request.caption.clone());
        }

        form = match &request.video {
            VideoInput::FileId(file_id) => form.text("video", file_id.clone()),
            VideoInput::Upload(path) => {
                let video_bytes: Vec<u8> = tokio::fs::read(path).await?;
                let name: String = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "video.mp4".to_string());
                form.part("video", file_part(video_bytes, &name, "video/mp4")?)
            }
        };

        let builder: RequestBuilder = self
            .http
            .post(self.method_url("sendVideo"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form);

        self.call("sendVideo", builder).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let _: bool = self
            .call_json(
                "deleteMessage",
                json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }
}
