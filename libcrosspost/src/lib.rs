//! Crosspost - publish one post to VK, Telegram and Facebook
//!
//! This library loads a message and its images from disk, uploads the images
//! to each platform and publishes the message with the uploaded attachments,
//! isolating the platforms from each other's failures.

pub mod config;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod report;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::{ConfigError, CrosspostError, PlatformError, Result};
pub use poster::{create_targets, Dispatcher, PostResult, Target};
pub use report::{Reporter, TracingReporter};
pub use types::{AttachmentRef, Post, Publication};
