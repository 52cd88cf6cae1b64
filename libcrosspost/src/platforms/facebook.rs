//! Facebook platform implementation
//!
//! Publishes to a group feed through the Graph API. Images are uploaded to
//! `/{group}/photos` with `published=false` so they do not appear on their
//! own; the returned ids are attached to the `/{group}/feed` post through
//! `attached_media`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::FacebookConfig;
use crate::error::{ConfigError, PlatformError, Result};
use crate::platforms::{decode, Platform, Stage};
use crate::transport::{FilePart, HttpReply, HttpTransport, Transport};
use crate::types::{AttachmentRef, ImageFile};

const GRAPH_URL: &str = "https://graph.facebook.com/v7.0";

/// Graph error codes for invalid or expired tokens and missing sessions
const AUTH_ERROR_CODES: [i64; 2] = [102, 190];

pub struct FacebookClient {
    transport: Box<dyn Transport>,
    access_token: SecretString,
    group_id: String,
}

#[derive(Deserialize)]
struct CreatedObject {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: GraphError,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<i64>,
}

#[derive(Serialize)]
struct MediaObject<'a> {
    media_fbid: &'a str,
}

impl FacebookClient {
    pub fn new(config: FacebookConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            access_token: config.access_token,
            group_id: config.group_id,
        }
    }

    /// Create a client with its own HTTP session
    pub fn from_config(config: FacebookConfig) -> Result<Self> {
        let transport =
            HttpTransport::new().map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::new(config, Box::new(transport)))
    }

    fn edge_url(&self, edge: &str) -> String {
        format!("{}/{}/{}", GRAPH_URL, self.group_id, edge)
    }
}

#[async_trait]
impl Platform for FacebookClient {
    fn name(&self) -> &str {
        "facebook"
    }

    async fn upload_image(&self, image: ImageFile) -> Result<AttachmentRef> {
        let reply = self
            .transport
            .post_multipart(
                &self.edge_url("photos"),
                vec![
                    ("access_token", self.access_token.expose_secret().to_string()),
                    ("published", "false".to_string()),
                ],
                FilePart::new("source", image),
            )
            .await
            .map_err(|e| Stage::Upload.transport_error("Facebook", "photo upload", e))?;

        let created: CreatedObject = parse_reply(&reply, "photo upload", Stage::Upload)?;
        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PlatformError::Upload("Facebook photo upload returned no id".to_string()))?;

        Ok(AttachmentRef::new(id))
    }

    async fn submit(&self, message: &str, attachments: &[AttachmentRef]) -> Result<String> {
        let mut form = vec![
            ("access_token", self.access_token.expose_secret().to_string()),
            ("message", message.to_string()),
        ];
        if !attachments.is_empty() {
            form.push(("attached_media", attached_media(attachments)));
        }

        let reply = self
            .transport
            .post_form(&self.edge_url("feed"), form)
            .await
            .map_err(|e| Stage::Submission.transport_error("Facebook", "feed post", e))?;

        let created: CreatedObject = parse_reply(&reply, "feed post", Stage::Submission)?;
        created.id.ok_or_else(|| {
            PlatformError::Submission("Facebook feed post returned no id".to_string()).into()
        })
    }
}

/// Render attachment references as the `attached_media` JSON array
fn attached_media(attachments: &[AttachmentRef]) -> String {
    let media: Vec<MediaObject<'_>> = attachments
        .iter()
        .map(|a| MediaObject {
            media_fbid: a.as_str(),
        })
        .collect();
    // Serializing string-only structs cannot fail
    serde_json::to_string(&media).unwrap_or_else(|_| "[]".to_string())
}

fn parse_reply<T: DeserializeOwned>(
    reply: &HttpReply,
    action: &str,
    stage: Stage,
) -> std::result::Result<T, PlatformError> {
    if reply.is_success() {
        return decode(reply, stage, "Facebook", action);
    }

    match serde_json::from_str::<ErrorEnvelope>(&reply.body) {
        Ok(envelope) => Err(map_graph_error(envelope.error, action, stage)),
        Err(_) => Err(stage.error(format!(
            "Facebook {} returned HTTP {}",
            action, reply.status
        ))),
    }
}

/// Map a Graph API error to PlatformError
///
/// - code 190/102 or type `OAuthException` → `PlatformError::Authentication`
/// - anything else → the error of the current stage
fn map_graph_error(error: GraphError, action: &str, stage: Stage) -> PlatformError {
    let is_auth = error.code.is_some_and(|c| AUTH_ERROR_CODES.contains(&c))
        || error.kind.as_deref() == Some("OAuthException");

    if is_auth {
        PlatformError::Authentication(format!(
            "Facebook rejected the access token ({}): {}. \
             Suggestion: Generate a new token with the groups publishing permission.",
            action, error.message
        ))
    } else {
        stage.error(format!(
            "Facebook {} failed: [{}] {}",
            action,
            error.code.unwrap_or_default(),
            error.message
        ))
    }
}
