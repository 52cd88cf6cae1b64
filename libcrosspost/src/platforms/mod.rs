//! Platform abstraction and implementations
//!
//! Every platform publishes the same way: upload each image to the
//! platform's media endpoint, collect an attachment reference per upload,
//! then submit the message with those references in a single call. The
//! [`Platform`] trait captures the two platform-specific steps and provides
//! the shared flow in [`Platform::publish`].
//!
//! # Examples
//!
//! ```no_run
//! use libcrosspost::config::VkConfig;
//! use libcrosspost::platforms::{vk::VkClient, Platform};
//! use libcrosspost::types::Post;
//!
//! # async fn example() -> libcrosspost::error::Result<()> {
//! let client = VkClient::from_config(VkConfig::from_env()?)?;
//! let post = Post::new("Hello from crosspost", vec!["images/cat.jpg".into()]);
//!
//! let publication = client.publish(&post).await?;
//! println!("Posted {} with {} images", publication.post_id, publication.attachments.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PlatformError, Result};
use crate::transport::{HttpReply, TransportError};
use crate::types::{AttachmentRef, ImageFile, Post, Publication};

pub mod facebook;
pub mod telegram;
pub mod vk;

// Mock implementations are available for all builds to support integration tests
pub mod mock;

/// Platform trait for publishing a post to one social network
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase identifier used in logs and results ("vk", "telegram", "facebook")
    fn name(&self) -> &str;

    /// Upload one image and return the reference that attaches it to a post
    ///
    /// # Errors
    ///
    /// - `PlatformError::Authentication` if the platform rejects the credentials
    /// - `PlatformError::Upload` for any other non-success response, or a
    ///   response that carries no usable reference
    async fn upload_image(&self, image: ImageFile) -> Result<AttachmentRef>;

    /// Submit the message with the given attachments in a single call
    ///
    /// Returns the platform-specific id of the created post.
    ///
    /// # Errors
    ///
    /// - `PlatformError::Authentication` if the platform rejects the credentials
    /// - `PlatformError::Submission` for any other failure
    async fn submit(&self, message: &str, attachments: &[AttachmentRef]) -> Result<String>;

    /// Upload every image of `post` in order, then submit the message
    ///
    /// Uploads are all-or-nothing: the first failing image aborts the flow
    /// and the message is never submitted. Each image is read right before
    /// its upload and released before the next one is read.
    async fn publish(&self, post: &Post) -> Result<Publication> {
        let mut attachments = Vec::with_capacity(post.images.len());

        for path in &post.images {
            let image = ImageFile::read(path).await?;
            debug!(
                platform = self.name(),
                file = %image.file_name,
                bytes = image.bytes.len(),
                "Uploading image"
            );
            let attachment = self.upload_image(image).await?;
            debug!(platform = self.name(), attachment = %attachment, "Image uploaded");
            attachments.push(attachment);
        }

        let post_id = self.submit(&post.message, &attachments).await?;

        Ok(Publication {
            post_id,
            attachments,
        })
    }
}

/// The step of the publishing flow a request belongs to
///
/// Used to classify failures that are not credential problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Submission,
}

impl Stage {
    pub fn error(self, message: String) -> PlatformError {
        match self {
            Stage::Upload => PlatformError::Upload(message),
            Stage::Submission => PlatformError::Submission(message),
        }
    }

    pub(crate) fn transport_error(
        self,
        platform: &str,
        action: &str,
        error: TransportError,
    ) -> PlatformError {
        self.error(format!("{} {} failed: {}", platform, action, error))
    }
}

/// Decode a JSON response body, classifying undecodable bodies by stage
pub(crate) fn decode<T: DeserializeOwned>(
    reply: &HttpReply,
    stage: Stage,
    platform: &str,
    action: &str,
) -> std::result::Result<T, PlatformError> {
    serde_json::from_str(&reply.body).map_err(|e| {
        stage.error(format!(
            "{} {} returned an unexpected response (HTTP {}): {}",
            platform, action, reply.status, e
        ))
    })
}
