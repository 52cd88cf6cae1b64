//! Telegram platform implementation
//!
//! Uses the Bot API directly. Each image is sent to the chat with
//! `sendPhoto`, then the text goes out with `sendMessage`. The attachment
//! reference of a photo is the `file_id` of its largest size.
//!
//! Requests are routed through `TELEGRAM_PROXIES` when configured. The bot
//! token is part of every request URL, so URLs are never logged.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::TelegramConfig;
use crate::error::{ConfigError, PlatformError, Result};
use crate::platforms::{decode, Platform, Stage};
use crate::transport::{FilePart, HttpReply, HttpTransport, Transport};
use crate::types::{AttachmentRef, ImageFile};

const API_URL: &str = "https://api.telegram.org";

pub struct TelegramClient {
    transport: Box<dyn Transport>,
    access_token: SecretString,
    chat_id: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Message {
    message_id: i64,
    #[serde(default)]
    photo: Vec<PhotoSize>,
}

#[derive(Deserialize)]
struct PhotoSize {
    file_id: String,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            access_token: config.access_token,
            chat_id: config.chat_id,
        }
    }

    /// Create a client with its own HTTP session, behind the configured proxy
    pub fn from_config(config: TelegramConfig) -> Result<Self> {
        let transport = match &config.proxy {
            Some(proxy) => HttpTransport::with_proxy(proxy).map_err(|e| ConfigError::Invalid {
                var: "TELEGRAM_PROXIES".to_string(),
                reason: e.to_string(),
            })?,
            None => HttpTransport::new().map_err(|e| ConfigError::HttpClient(e.to_string()))?,
        };
        Ok(Self::new(config, Box::new(transport)))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_URL, self.access_token.expose_secret(), method)
    }
}

#[async_trait]
impl Platform for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn upload_image(&self, image: ImageFile) -> Result<AttachmentRef> {
        let reply = self
            .transport
            .post_multipart(
                &self.method_url("sendPhoto"),
                vec![("chat_id", self.chat_id.clone())],
                FilePart::new("photo", image),
            )
            .await
            .map_err(|e| Stage::Upload.transport_error("Telegram", "sendPhoto", e))?;

        let message: Message = unwrap_result(&reply, "sendPhoto", Stage::Upload)?;
        let largest = message.photo.last().ok_or_else(|| {
            PlatformError::Upload(format!(
                "Telegram sendPhoto returned message {} without a photo",
                message.message_id
            ))
        })?;

        Ok(AttachmentRef::new(largest.file_id.clone()))
    }

    async fn submit(&self, message: &str, _attachments: &[AttachmentRef]) -> Result<String> {
        // Photos are already in the chat as separate messages
        let reply = self
            .transport
            .post_form(
                &self.method_url("sendMessage"),
                vec![
                    ("chat_id", self.chat_id.clone()),
                    ("text", message.to_string()),
                ],
            )
            .await
            .map_err(|e| Stage::Submission.transport_error("Telegram", "sendMessage", e))?;

        let sent: Message = unwrap_result(&reply, "sendMessage", Stage::Submission)?;
        Ok(sent.message_id.to_string())
    }
}

/// Check the Bot API envelope and return its `result`
///
/// HTTP 401 (or `error_code` 401) means the bot token was refused.
fn unwrap_result<T: DeserializeOwned>(
    reply: &HttpReply,
    method: &str,
    stage: Stage,
) -> std::result::Result<T, PlatformError> {
    let envelope: Envelope<T> = match decode(reply, stage, "Telegram", method) {
        Ok(envelope) => envelope,
        Err(_) if reply.status == 401 => return Err(unauthorized(method, "Unauthorized")),
        Err(_) if !reply.is_success() => {
            return Err(stage.error(format!(
                "Telegram {} returned HTTP {}",
                method, reply.status
            )))
        }
        Err(e) => return Err(e),
    };

    let code = envelope.error_code.unwrap_or(reply.status);
    if !envelope.ok || !reply.is_success() {
        let description = envelope
            .description
            .unwrap_or_else(|| format!("HTTP {}", reply.status));
        if code == 401 {
            return Err(unauthorized(method, &description));
        }
        return Err(stage.error(format!(
            "Telegram {} failed: [{}] {}",
            method, code, description
        )));
    }

    envelope
        .result
        .ok_or_else(|| stage.error(format!("Telegram {} returned no result", method)))
}

fn unauthorized(method: &str, description: &str) -> PlatformError {
    PlatformError::Authentication(format!(
        "Telegram rejected the bot token ({}): {}. \
         Suggestion: Check TELEGRAM_ACCESS_TOKEN against the token issued by @BotFather.",
        method, description
    ))
}
