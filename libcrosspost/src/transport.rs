//! Outbound HTTP seam shared by the platform clients
//!
//! Platform clients only speak in form fields and files; the [`Transport`]
//! trait turns those into HTTP requests. [`HttpTransport`] is the `reqwest`
//! implementation used in production, each platform owning its own instance
//! so that sessions and proxies are never shared.

use async_trait::async_trait;
use reqwest::multipart;
use thiserror::Error;

use crate::types::ImageFile;

/// Form fields in submission order
pub type Form = Vec<(&'static str, String)>;

/// Status and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A `200 OK` reply
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A file sent as one part of a multipart request
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: &'static str,
    pub image: ImageFile,
}

impl FilePart {
    pub fn new(field: &'static str, image: ImageFile) -> Self {
        Self { field, image }
    }
}

/// The request never produced a response (connection, proxy, TLS, body read)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `form` as `application/x-www-form-urlencoded`
    async fn post_form(&self, url: &str, form: Form) -> Result<HttpReply, TransportError>;

    /// POST `form` plus `file` as `multipart/form-data`
    async fn post_multipart(
        &self,
        url: &str,
        form: Form,
        file: FilePart,
    ) -> Result<HttpReply, TransportError>;
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a direct connection
    pub fn new() -> Result<Self, TransportError> {
        Self::build(None)
    }

    /// Create a transport that routes every request through `proxy_url`
    ///
    /// Accepts `http://`, `https://` and `socks5://` style URLs.
    pub fn with_proxy(proxy_url: &str) -> Result<Self, TransportError> {
        Self::build(Some(proxy_url))
    }

    fn build(proxy_url: Option<&str>) -> Result<Self, TransportError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("crosspost/", env!("CARGO_PKG_VERSION")));

        if let Some(url) = proxy_url {
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| TransportError(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read_reply(response: reqwest::Response) -> Result<HttpReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(describe)?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, url: &str, form: Form) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(describe)?;

        Self::read_reply(response).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        form: Form,
        file: FilePart,
    ) -> Result<HttpReply, TransportError> {
        let content_type = file.image.content_type();
        let part = multipart::Part::bytes(file.image.bytes)
            .file_name(file.image.file_name)
            .mime_str(content_type)
            .map_err(describe)?;

        let mut multipart = multipart::Form::new();
        for (name, value) in form {
            multipart = multipart.text(name, value);
        }
        multipart = multipart.part(file.field, part);

        let response = self
            .client
            .post(url)
            .multipart(multipart)
            .send()
            .await
            .map_err(describe)?;

        Self::read_reply(response).await
    }
}

/// Render a `reqwest` error without its URL, which may embed a bot token
fn describe(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    TransportError(format!("{}: {}", kind, error.without_url()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_success_range() {
        assert!(HttpReply::ok("{}").is_success());
        assert!(HttpReply::new(201, "").is_success());
        assert!(!HttpReply::new(302, "").is_success());
        assert!(!HttpReply::new(400, "").is_success());
        assert!(!HttpReply::new(500, "").is_success());
    }

    #[test]
    fn test_http_transport_creation() {
        assert!(HttpTransport::new().is_ok());
    }

    #[test]
    fn test_http_transport_with_proxy() {
        assert!(HttpTransport::with_proxy("http://127.0.0.1:3128").is_ok());
    }

    #[test]
    fn test_http_transport_rejects_malformed_proxy() {
        let result = HttpTransport::with_proxy("not a url");

        let err = result.err().expect("malformed proxy should be rejected");
        assert!(err.to_string().contains("Invalid proxy URL"));
    }
}
