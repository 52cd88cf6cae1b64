//! Mock transport and platform implementations for testing
//!
//! [`MockTransport`] stands in for the HTTP layer: it records every request
//! and answers through a scripted responder, so the real platform clients can
//! be exercised without network access. [`MockPlatform`] replaces a whole
//! client and fails on demand, which is what dispatcher tests need.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{PlatformError, Result};
use crate::platforms::Platform;
use crate::transport::{FilePart, Form, HttpReply, Transport, TransportError};
use crate::types::{AttachmentRef, ImageFile};

/// A request captured by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub fields: Vec<(String, String)>,
    /// Present for multipart uploads
    pub file: Option<RecordedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

impl RecordedRequest {
    /// Value of the first form field called `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_upload(&self) -> bool {
        self.file.is_some()
    }
}

type Responder =
    dyn Fn(&RecordedRequest) -> std::result::Result<HttpReply, TransportError> + Send + Sync;

/// Recording transport with a scripted responder
///
/// Clones share the same request log, so a test can hand one clone to a
/// client and inspect the other.
#[derive(Clone)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> std::result::Result<HttpReply, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    /// Answer every request with the same status and body
    pub fn replying(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_| Ok(HttpReply::new(status, body.clone())))
    }

    /// Fail every request before a response is produced
    pub fn unreachable(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(move |_| Err(TransportError(reason.clone())))
    }

    /// Happy-path VK API: photo ids count up from 1 under owner `-42`
    pub fn vk() -> Self {
        let saved = AtomicUsize::new(0);
        Self::new(move |request| {
            let body = if request.url.ends_with("/photos.getUploadServer") {
                r#"{"response":{"upload_url":"https://pu.vk.com/upload","album_id":7}}"#.to_string()
            } else if request.is_upload() {
                r#"{"server":100,"photos_list":"[{\"photo\":\"abc\"}]","aid":7,"hash":"upload-hash"}"#
                    .to_string()
            } else if request.url.ends_with("/photos.save") {
                let id = saved.fetch_add(1, Ordering::SeqCst) + 1;
                format!(r#"{{"response":[{{"id":{},"owner_id":-42}}]}}"#, id)
            } else if request.url.ends_with("/wall.post") {
                r#"{"response":{"post_id":1000}}"#.to_string()
            } else {
                return Ok(HttpReply::new(404, "{}"));
            };
            Ok(HttpReply::ok(body))
        })
    }

    /// Happy-path Telegram Bot API: photo `file_id`s are `large-1`, `large-2`, ...
    pub fn telegram() -> Self {
        let photos = AtomicUsize::new(0);
        Self::new(move |request| {
            let body = if request.url.ends_with("/sendPhoto") {
                let n = photos.fetch_add(1, Ordering::SeqCst) + 1;
                format!(
                    r#"{{"ok":true,"result":{{"message_id":{n},"photo":[{{"file_id":"small-{n}"}},{{"file_id":"large-{n}"}}]}}}}"#
                )
            } else if request.url.ends_with("/sendMessage") {
                r#"{"ok":true,"result":{"message_id":1000}}"#.to_string()
            } else {
                return Ok(HttpReply::new(
                    404,
                    r#"{"ok":false,"error_code":404,"description":"Not Found"}"#,
                ));
            };
            Ok(HttpReply::ok(body))
        })
    }

    /// Happy-path Graph API: photo ids are `photo-1`, `photo-2`, ...
    pub fn facebook() -> Self {
        let photos = AtomicUsize::new(0);
        Self::new(move |request| {
            let body = if request.url.ends_with("/photos") {
                let n = photos.fetch_add(1, Ordering::SeqCst) + 1;
                format!(r#"{{"id":"photo-{}"}}"#, n)
            } else if request.url.ends_with("/feed") {
                r#"{"id":"987_1000"}"#.to_string()
            } else {
                return Ok(HttpReply::new(404, "{}"));
            };
            Ok(HttpReply::ok(body))
        })
    }

    /// All requests in the order they were made
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Multipart requests only
    pub fn uploads(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(RecordedRequest::is_upload)
            .collect()
    }

    fn record(&self, request: RecordedRequest) -> std::result::Result<HttpReply, TransportError> {
        let reply = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        reply
    }
}

fn owned_fields(form: Form) -> Vec<(String, String)> {
    form.into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_form(
        &self,
        url: &str,
        form: Form,
    ) -> std::result::Result<HttpReply, TransportError> {
        self.record(RecordedRequest {
            url: url.to_string(),
            fields: owned_fields(form),
            file: None,
        })
    }

    async fn post_multipart(
        &self,
        url: &str,
        form: Form,
        file: FilePart,
    ) -> std::result::Result<HttpReply, TransportError> {
        let recorded = RecordedFile {
            field: file.field.to_string(),
            content_type: file.image.content_type().to_string(),
            size: file.image.bytes.len(),
            file_name: file.image.file_name,
        };
        self.record(RecordedRequest {
            url: url.to_string(),
            fields: owned_fields(form),
            file: Some(recorded),
        })
    }
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g., "mock-vk", "mock-telegram")
    pub name: String,

    /// Error returned by every upload, if any
    pub upload_error: Option<PlatformError>,

    /// Error returned by the submission, if any
    pub submit_error: Option<PlatformError>,

    /// Number of times upload_image has been called
    pub upload_call_count: Arc<Mutex<usize>>,

    /// Messages that have been submitted, with their attachment count
    pub submitted: Arc<Mutex<Vec<(String, usize)>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            upload_error: None,
            submit_error: None,
            upload_call_count: Arc::new(Mutex::new(0)),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
///
/// Uses the default [`Platform::publish`] flow, so image files are really
/// read from disk.
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform that refuses its credentials on submission
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            submit_error: Some(PlatformError::Authentication(error.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock platform whose uploads fail
    pub fn upload_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            upload_error: Some(PlatformError::Upload(error.to_string())),
            ..Default::default()
        })
    }

    /// Create a mock platform whose submission fails
    pub fn submit_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            submit_error: Some(PlatformError::Submission(error.to_string())),
            ..Default::default()
        })
    }

    /// Handle to the shared state, usable after the platform is boxed
    pub fn config(&self) -> MockConfig {
        self.config.clone()
    }

    /// Get the number of times upload_image was called
    pub fn upload_call_count(&self) -> usize {
        *self.config.upload_call_count.lock().unwrap()
    }

    /// Get all messages that were submitted
    pub fn submitted(&self) -> Vec<(String, usize)> {
        self.config.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn upload_image(&self, image: ImageFile) -> Result<AttachmentRef> {
        let count = {
            let mut count = self.config.upload_call_count.lock().unwrap();
            *count += 1;
            *count
        };

        match &self.config.upload_error {
            Some(error) => Err(error.clone().into()),
            None => Ok(AttachmentRef::new(format!(
                "{}:{}:{}",
                self.config.name, count, image.file_name
            ))),
        }
    }

    async fn submit(&self, message: &str, attachments: &[AttachmentRef]) -> Result<String> {
        if let Some(error) = &self.config.submit_error {
            return Err(error.clone().into());
        }

        let mut submitted = self.config.submitted.lock().unwrap();
        submitted.push((message.to_string(), attachments.len()));
        Ok(format!("{}:post-{}", self.config.name, submitted.len()))
    }
}
