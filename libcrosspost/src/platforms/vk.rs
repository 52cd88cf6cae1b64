//! VK platform implementation
//!
//! Posts to a community wall through the VK API. A photo takes three calls:
//! `photos.getUploadServer` for an upload URL, a multipart upload to that
//! URL, and `photos.save` to move the uploaded file into the album. The
//! saved photo is attached to `wall.post` as `photo{owner_id}_{id}`.
//!
//! The API answers HTTP 200 for application errors and reports them in an
//! `error` object instead of `response`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::VkConfig;
use crate::error::{ConfigError, PlatformError, Result};
use crate::platforms::{decode, Platform, Stage};
use crate::transport::{FilePart, Form, HttpTransport, Transport};
use crate::types::{AttachmentRef, ImageFile};

const API_URL: &str = "https://api.vk.com/method";
const API_VERSION: &str = "5.131";

/// Error codes meaning the token itself was refused:
/// 5 (user authorization failed), 27 (group token), 28 (application token)
const AUTH_ERROR_CODES: [i64; 3] = [5, 27, 28];

pub struct VkClient {
    transport: Box<dyn Transport>,
    access_token: SecretString,
    group_id: u64,
    album_id: u64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

#[derive(Deserialize)]
struct UploadServer {
    upload_url: String,
}

#[derive(Deserialize)]
struct UploadedFile {
    server: serde_json::Value,
    photos_list: String,
    hash: String,
}

#[derive(Deserialize)]
struct SavedPhoto {
    id: i64,
    owner_id: i64,
}

#[derive(Deserialize)]
struct WallPost {
    post_id: i64,
}

impl VkClient {
    pub fn new(config: VkConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            access_token: config.access_token,
            group_id: config.group_id,
            album_id: config.album_id,
        }
    }

    /// Create a client with its own HTTP session
    pub fn from_config(config: VkConfig) -> Result<Self> {
        let transport =
            HttpTransport::new().map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::new(config, Box::new(transport)))
    }

    /// Call an API method and unwrap its `response` payload
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        mut params: Form,
        stage: Stage,
    ) -> std::result::Result<T, PlatformError> {
        params.push(("access_token", self.access_token.expose_secret().to_string()));
        params.push(("v", API_VERSION.to_string()));

        let url = format!("{}/{}", API_URL, method);
        let reply = self
            .transport
            .post_form(&url, params)
            .await
            .map_err(|e| stage.transport_error("VK", method, e))?;

        if !reply.is_success() {
            return Err(stage.error(format!("VK {} returned HTTP {}", method, reply.status)));
        }

        let envelope: Envelope<T> = decode(&reply, stage, "VK", method)?;
        if let Some(error) = envelope.error {
            return Err(map_api_error(error, method, stage));
        }

        envelope
            .response
            .ok_or_else(|| stage.error(format!("VK {} returned no response", method)))
    }

    /// Send the file to the upload server handed out by `photos.getUploadServer`
    async fn upload_file(
        &self,
        upload_url: &str,
        image: ImageFile,
    ) -> std::result::Result<UploadedFile, PlatformError> {
        let reply = self
            .transport
            .post_multipart(upload_url, Vec::new(), FilePart::new("file1", image))
            .await
            .map_err(|e| Stage::Upload.transport_error("VK", "photo upload", e))?;

        if !reply.is_success() {
            return Err(PlatformError::Upload(format!(
                "VK photo upload returned HTTP {}",
                reply.status
            )));
        }

        let uploaded: UploadedFile = decode(&reply, Stage::Upload, "VK", "photo upload")?;
        if uploaded.photos_list.trim().is_empty() || uploaded.photos_list.trim() == "[]" {
            return Err(PlatformError::Upload(
                "VK upload server accepted no photos".to_string(),
            ));
        }

        Ok(uploaded)
    }
}

#[async_trait]
impl Platform for VkClient {
    fn name(&self) -> &str {
        "vk"
    }

    async fn upload_image(&self, image: ImageFile) -> Result<AttachmentRef> {
        let album_params = || {
            vec![
                ("album_id", self.album_id.to_string()),
                ("group_id", self.group_id.to_string()),
            ]
        };

        let server: UploadServer = self
            .call("photos.getUploadServer", album_params(), Stage::Upload)
            .await?;

        let uploaded = self.upload_file(&server.upload_url, image).await?;

        let server_id = match uploaded.server {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let mut save_params = album_params();
        save_params.push(("server", server_id));
        save_params.push(("photos_list", uploaded.photos_list));
        save_params.push(("hash", uploaded.hash));

        let saved: Vec<SavedPhoto> = self.call("photos.save", save_params, Stage::Upload).await?;
        let photo = saved.first().ok_or_else(|| {
            PlatformError::Upload("VK photos.save returned no photos".to_string())
        })?;

        Ok(AttachmentRef::new(format!("photo{}_{}", photo.owner_id, photo.id)))
    }

    async fn submit(&self, message: &str, attachments: &[AttachmentRef]) -> Result<String> {
        let mut params = vec![
            ("owner_id", format!("-{}", self.group_id)),
            ("message", message.to_string()),
        ];
        if !attachments.is_empty() {
            let joined = attachments
                .iter()
                .map(AttachmentRef::as_str)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("attachments", joined));
        }

        let posted: WallPost = self.call("wall.post", params, Stage::Submission).await?;
        Ok(posted.post_id.to_string())
    }
}

/// Map a VK API error object to PlatformError
///
/// Token failures become `Authentication`; everything else is attributed to
/// the stage the call belongs to.
fn map_api_error(error: ApiError, method: &str, stage: Stage) -> PlatformError {
    if AUTH_ERROR_CODES.contains(&error.error_code) {
        PlatformError::Authentication(format!(
            "VK rejected the access token ({}): [{}] {}. \
             Suggestion: Issue a new community token with photos and wall access.",
            method, error.error_code, error.error_msg
        ))
    } else {
        stage.error(format!(
            "VK {} failed: [{}] {}",
            method, error.error_code, error.error_msg
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrosspostError;
    use crate::platforms::mock::MockTransport;
    use crate::transport::HttpReply;
    use crate::types::Post;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> VkConfig {
        VkConfig {
            access_token: SecretString::from("vk-token"),
            group_id: 42,
            album_id: 7,
        }
    }

    fn client(transport: &MockTransport) -> VkClient {
        VkClient::new(test_config(), Box::new(transport.clone()))
    }

    fn image_dir(names: &[&str]) -> (TempDir, Vec<std::path::PathBuf>) {
        let temp_dir = TempDir::new().unwrap();
        let paths = names
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                fs::write(&path, b"image-bytes").unwrap();
                path
            })
            .collect();
        (temp_dir, paths)
    }

    #[tokio::test]
    async fn test_publish_without_images() {
        let transport = MockTransport::vk();
        let vk = client(&transport);

        let publication = vk.publish(&Post::new("hello world", vec![])).await.unwrap();

        assert!(publication.attachments.is_empty());
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/wall.post"));
        assert_eq!(requests[0].field("owner_id"), Some("-42"));
        assert_eq!(requests[0].field("message"), Some("hello world"));
        assert_eq!(requests[0].field("attachments"), None);
        assert_eq!(requests[0].field("access_token"), Some("vk-token"));
        assert_eq!(requests[0].field("v"), Some(API_VERSION));
    }

    #[tokio::test]
    async fn test_publish_with_images_builds_photo_attachments() {
        let (_dir, images) = image_dir(&["a.jpg", "b.png"]);
        let transport = MockTransport::vk();
        let vk = client(&transport);

        let publication = vk.publish(&Post::new("caption", images)).await.unwrap();

        assert_eq!(
            publication.attachments,
            vec![AttachmentRef::new("photo-42_1"), AttachmentRef::new("photo-42_2")]
        );

        let uploads = transport.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].file.as_ref().unwrap().field, "file1");
        assert_eq!(uploads[0].file.as_ref().unwrap().file_name, "a.jpg");
        assert_eq!(uploads[1].file.as_ref().unwrap().file_name, "b.png");

        let wall_post = transport.requests().pop().unwrap();
        assert!(wall_post.url.ends_with("/wall.post"));
        assert_eq!(wall_post.field("attachments"), Some("photo-42_1,photo-42_2"));
    }

    #[tokio::test]
    async fn test_photos_save_receives_upload_result() {
        let (_dir, images) = image_dir(&["a.jpg"]);
        let transport = MockTransport::vk();
        let vk = client(&transport);

        vk.publish(&Post::new("caption", images)).await.unwrap();

        let save = transport
            .requests()
            .into_iter()
            .find(|r| r.url.ends_with("/photos.save"))
            .unwrap();
        assert_eq!(save.field("album_id"), Some("7"));
        assert_eq!(save.field("group_id"), Some("42"));
        assert_eq!(save.field("server"), Some("100"));
        assert_eq!(save.field("hash"), Some("upload-hash"));
    }

    #[tokio::test]
    async fn test_auth_error_code_maps_to_authentication() {
        let transport = MockTransport::new(|_| {
            Ok(HttpReply::ok(
                r#"{"error":{"error_code":5,"error_msg":"User authorization failed: invalid access_token"}}"#,
            ))
        });
        let vk = client(&transport);

        let result = vk.submit("hello", &[]).await;

        match result {
            Err(CrosspostError::Platform(PlatformError::Authentication(message))) => {
                assert!(message.contains("wall.post"));
                assert!(message.contains("invalid access_token"));
            }
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_during_upload_is_upload_error() {
        let (_dir, images) = image_dir(&["a.jpg"]);
        let transport = MockTransport::new(|request| {
            if request.url.ends_with("/photos.getUploadServer") {
                Ok(HttpReply::ok(
                    r#"{"error":{"error_code":200,"error_msg":"Access to album denied"}}"#,
                ))
            } else {
                Ok(HttpReply::ok(r#"{"response":{"post_id":1}}"#))
            }
        });
        let vk = client(&transport);

        let result = vk.publish(&Post::new("caption", images)).await;

        assert!(matches!(
            result,
            Err(CrosspostError::Platform(PlatformError::Upload(ref m))) if m.contains("Access to album denied")
        ));
        assert!(
            !transport.requests().iter().any(|r| r.url.ends_with("/wall.post")),
            "wall.post must not be called after a failed upload"
        );
    }

    #[tokio::test]
    async fn test_empty_photos_list_is_upload_error() {
        let (_dir, images) = image_dir(&["a.jpg"]);
        let transport = MockTransport::new(|request| {
            if request.url.ends_with("/photos.getUploadServer") {
                Ok(HttpReply::ok(
                    r#"{"response":{"upload_url":"https://pu.vk.com/upload"}}"#,
                ))
            } else {
                Ok(HttpReply::ok(r#"{"server":1,"photos_list":"[]","hash":"h"}"#))
            }
        });
        let vk = client(&transport);

        let result = vk.publish(&Post::new("caption", images)).await;

        assert!(matches!(
            result,
            Err(CrosspostError::Platform(PlatformError::Upload(ref m))) if m.contains("accepted no photos")
        ));
    }

    #[tokio::test]
    async fn test_http_failure_on_wall_post_is_submission_error() {
        let transport = MockTransport::new(|_| Ok(HttpReply::new(502, "Bad Gateway")));
        let vk = client(&transport);

        let result = vk.submit("hello", &[]).await;

        assert!(matches!(
            result,
            Err(CrosspostError::Platform(PlatformError::Submission(ref m))) if m.contains("HTTP 502")
        ));
    }

    #[test]
    fn test_map_api_error_group_token() {
        let error = ApiError {
            error_code: 27,
            error_msg: "Group authorization failed".to_string(),
        };

        let mapped = map_api_error(error, "wall.post", Stage::Submission);

        assert!(matches!(mapped, PlatformError::Authentication(ref m) if m.contains("Suggestion")));
    }

    #[test]
    fn test_platform_name() {
        let vk = client(&MockTransport::vk());
        assert_eq!(vk.name(), "vk");
    }
}
