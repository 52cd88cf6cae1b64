//! Multi-platform posting orchestration
//!
//! The [`Dispatcher`] publishes one [`Post`] to every configured target in
//! order. Targets are independent: a failure on one is classified, reported
//! and recorded, and the next target is attempted anyway. Calls are strictly
//! sequential and never retried.

use tracing::debug;

use crate::config::{FacebookConfig, TelegramConfig, VkConfig};
use crate::error::{CrosspostError, PlatformError, Result};
use crate::platforms::facebook::FacebookClient;
use crate::platforms::telegram::TelegramClient;
use crate::platforms::vk::VkClient;
use crate::platforms::Platform;
use crate::report::Reporter;
use crate::types::Post;

/// Result of posting to a single platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResult {
    /// Platform name (e.g., "vk", "telegram", "facebook")
    pub platform: String,
    /// Whether the post was successful
    pub success: bool,
    /// Platform-specific post ID (if successful)
    pub platform_post_id: Option<String>,
    /// Number of images attached (if successful)
    pub attachments: usize,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// A platform slot of the run
///
/// Holds either a ready client or the error that prevented building it, so
/// that a misconfigured platform is reported in its turn instead of
/// aborting the whole run.
pub struct Target {
    name: String,
    platform: Result<Box<dyn Platform>>,
}

impl Target {
    pub fn ready(platform: Box<dyn Platform>) -> Self {
        Self {
            name: platform.name().to_string(),
            platform: Ok(platform),
        }
    }

    pub fn unavailable(name: &str, error: CrosspostError) -> Self {
        Self {
            name: name.to_string(),
            platform: Err(error),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ready(&self) -> bool {
        self.platform.is_ok()
    }
}

/// Multi-platform dispatcher with per-platform failure isolation
pub struct Dispatcher {
    targets: Vec<Target>,
    reporter: Box<dyn Reporter>,
}

impl Dispatcher {
    /// Create a new Dispatcher
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libcrosspost::poster::{create_targets, Dispatcher};
    /// use libcrosspost::report::TracingReporter;
    /// use libcrosspost::types::Post;
    ///
    /// # async fn example() -> libcrosspost::error::Result<()> {
    /// let vars: Vec<(String, String)> = std::env::vars().collect();
    /// let dispatcher = Dispatcher::new(create_targets(&vars), Box::new(TracingReporter));
    ///
    /// let post = Post::load("message.txt".as_ref(), "images".as_ref()).await?;
    /// for result in dispatcher.dispatch(&post).await {
    ///     println!("{}: {}", result.platform, result.success);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(targets: Vec<Target>, reporter: Box<dyn Reporter>) -> Self {
        Self { targets, reporter }
    }

    /// Publish `post` to every target, in order
    ///
    /// Never fails: every outcome is reported and returned as a PostResult,
    /// one per target.
    pub async fn dispatch(&self, post: &Post) -> Vec<PostResult> {
        let mut results = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            debug!(platform = target.name(), "Posting to platform");

            let result = match &target.platform {
                Ok(platform) => match platform.publish(post).await {
                    Ok(publication) => {
                        self.reporter.info(&format!(
                            "Post published to {} (id {}, {} images)",
                            target.name(),
                            publication.post_id,
                            publication.attachments.len()
                        ));
                        PostResult {
                            platform: target.name().to_string(),
                            success: true,
                            attachments: publication.attachments.len(),
                            platform_post_id: Some(publication.post_id),
                            error: None,
                        }
                    }
                    Err(error) => self.failed(target, &error),
                },
                Err(error) => self.failed(target, error),
            };

            results.push(result);
        }

        results
    }

    fn failed(&self, target: &Target, error: &CrosspostError) -> PostResult {
        let message = describe_failure(target.name(), error);
        self.reporter.error(&message);
        PostResult {
            platform: target.name().to_string(),
            success: false,
            platform_post_id: None,
            attachments: 0,
            error: Some(message),
        }
    }
}

/// Render a failure as one log line naming the platform and the error kind
pub fn describe_failure(platform: &str, error: &CrosspostError) -> String {
    match error {
        CrosspostError::Config(error) => {
            format!("Skipping {}: configuration error: {}", platform, error)
        }
        CrosspostError::Platform(PlatformError::Authentication(message)) => {
            format!("Posting to {} failed: authentication error: {}", platform, message)
        }
        CrosspostError::Platform(PlatformError::Upload(message)) => format!(
            "Posting to {} failed: image upload error, post not published: {}",
            platform, message
        ),
        CrosspostError::Platform(PlatformError::Submission(message)) => {
            format!("Posting to {} failed: submission error: {}", platform, message)
        }
        CrosspostError::FileRead { path, source } => format!(
            "Posting to {} failed: could not read {}: {}",
            platform,
            path.display(),
            source
        ),
    }
}

/// Build the three targets, in their fixed order, from environment variables
///
/// A platform whose variables are missing or malformed becomes an
/// unavailable target carrying its configuration error.
pub fn create_targets(vars: &[(String, String)]) -> Vec<Target> {
    vec![
        build_target("vk", || {
            let config = VkConfig::from_vars(vars)?;
            let client: Box<dyn Platform> = Box::new(VkClient::from_config(config)?);
            Ok(client)
        }),
        build_target("telegram", || {
            let config = TelegramConfig::from_vars(vars)?;
            let client: Box<dyn Platform> = Box::new(TelegramClient::from_config(config)?);
            Ok(client)
        }),
        build_target("facebook", || {
            let config = FacebookConfig::from_vars(vars)?;
            let client: Box<dyn Platform> = Box::new(FacebookClient::from_config(config)?);
            Ok(client)
        }),
    ]
}

fn build_target<F>(name: &str, build: F) -> Target
where
    F: FnOnce() -> Result<Box<dyn Platform>>,
{
    match build() {
        Ok(platform) => Target::ready(platform),
        Err(error) => Target::unavailable(name, error),
    }
}
