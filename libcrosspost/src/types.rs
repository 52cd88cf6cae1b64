//! Core types for crosspost

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CrosspostError, Result};

/// Content published to every platform during one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Message text, exactly as read from the message file
    pub message: String,
    /// Image files attached to the post, in upload order
    pub images: Vec<PathBuf>,
}

impl Post {
    pub fn new(message: impl Into<String>, images: Vec<PathBuf>) -> Self {
        Self {
            message: message.into(),
            images,
        }
    }

    /// Load the message file and collect the images next to it
    ///
    /// The message is kept byte-for-byte: no trimming, no newline
    /// normalization.
    pub async fn load(message_file: &Path, images_dir: &Path) -> Result<Self> {
        let message = tokio::fs::read_to_string(message_file)
            .await
            .map_err(|e| CrosspostError::file_read(message_file, e))?;
        let images = collect_images(images_dir).await;

        Ok(Self { message, images })
    }
}

/// List the image candidates directly inside `dir`
///
/// Matches regular files whose name has an extension (`*.*`), skipping
/// dotfiles. Results are sorted by file name. A directory that is missing or
/// cannot be listed yields no images, so the text is still published.
pub async fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Image directory {} does not exist", dir.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Cannot list image directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped listing image directory {}: {}", dir.display(), e);
                break;
            }
        };

        // Non-UTF-8 names are matched on their lossy form and kept as-is
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || !name.contains('.') {
            continue;
        }

        match entry.file_type().await {
            Ok(file_type) if file_type.is_file() => images.push(entry.path()),
            Ok(_) => {}
            Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    images.sort();
    images
}

// ============================================================================
// Attachment Types
// ============================================================================

/// Supported image MIME types for attachments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Get the MIME type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image loaded into memory for a single upload
///
/// Dropped once the upload call returns, so only one image is held at a time.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: Option<ImageMimeType>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CrosspostError::file_read(path, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageMimeType::from_extension);

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    /// MIME type sent in the multipart part header
    pub fn content_type(&self) -> &'static str {
        self.mime_type
            .map(|m| m.as_str())
            .unwrap_or("application/octet-stream")
    }
}

/// Platform-specific reference to an uploaded image
///
/// - VK: `photo{owner_id}_{id}`
/// - Telegram: the `file_id` of the uploaded photo
/// - Facebook: the unpublished photo id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful publish on one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Platform-specific id of the created post or message
    pub post_id: String,
    /// References of the images attached to the post, in upload order
    pub attachments: Vec<AttachmentRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_keeps_message_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let message_path = temp_dir.path().join("message.txt");
        fs::write(&message_path, "  hello world\n\n").unwrap();

        let post = Post::load(&message_path, &temp_dir.path().join("images"))
            .await
            .unwrap();

        assert_eq!(post.message, "  hello world\n\n");
        assert!(post.images.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_message_file() {
        let temp_dir = TempDir::new().unwrap();
        let message_path = temp_dir.path().join("missing.txt");

        let result = Post::load(&message_path, temp_dir.path()).await;

        match result {
            Err(CrosspostError::FileRead { path, .. }) => assert_eq!(path, message_path),
            other => panic!("Expected FileRead error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_collect_images_matches_files_with_extension() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("b.png"), b"png").unwrap();
        fs::write(dir.join("a.jpg"), b"jpg").unwrap();
        fs::write(dir.join("README"), b"no extension").unwrap();
        fs::write(dir.join(".hidden.jpg"), b"dotfile").unwrap();
        fs::create_dir(dir.join("nested.d")).unwrap();
        fs::write(dir.join("nested.d").join("c.jpg"), b"nested").unwrap();

        let images = collect_images(dir).await;

        assert_eq!(images, vec![dir.join("a.jpg"), dir.join("b.png")]);
    }

    #[tokio::test]
    async fn test_collect_images_missing_directory() {
        let temp_dir = TempDir::new().unwrap();

        let images = collect_images(&temp_dir.path().join("nope")).await;

        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_load_with_file_as_image_directory() {
        let temp_dir = TempDir::new().unwrap();
        let message_path = temp_dir.path().join("message.txt");
        fs::write(&message_path, "hello world").unwrap();

        let post = Post::load(&message_path, &message_path).await.unwrap();

        assert_eq!(post.message, "hello world");
        assert!(post.images.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_images_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.jpg");
        let path = temp_dir.path().join(name);
        if fs::write(&path, b"jpg").is_err() {
            // Some filesystems only accept UTF-8 names
            return;
        }

        let images = collect_images(temp_dir.path()).await;

        assert_eq!(images, vec![path]);
    }

    #[tokio::test]
    async fn test_image_file_read_detects_mime_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.JPG");
        fs::write(&path, b"\xff\xd8\xff").unwrap();

        let image = ImageFile::read(&path).await.unwrap();

        assert_eq!(image.file_name, "photo.JPG");
        assert_eq!(image.mime_type, Some(ImageMimeType::Jpeg));
        assert_eq!(image.content_type(), "image/jpeg");
        assert_eq!(image.bytes, b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn test_image_file_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.tiff");
        fs::write(&path, b"II*").unwrap();

        let image = ImageFile::read(&path).await.unwrap();

        assert_eq!(image.mime_type, None);
        assert_eq!(image.content_type(), "application/octet-stream");
    }

    #[test]
    fn test_mime_type_from_extension() {
        assert_eq!(ImageMimeType::from_extension("jpeg"), Some(ImageMimeType::Jpeg));
        assert_eq!(ImageMimeType::from_extension("PNG"), Some(ImageMimeType::Png));
        assert_eq!(ImageMimeType::from_extension("webp"), Some(ImageMimeType::WebP));
        assert_eq!(ImageMimeType::from_extension("txt"), None);
    }
}
