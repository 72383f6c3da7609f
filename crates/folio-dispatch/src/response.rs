//! Request and response types and the response factory.
//!
//! Requests and responses are plain [`http`] values with `String` bodies.
//! [`ResponseFactory`] builds the few responses the core produces;
//! [`ResponseExt`] adds builder-style tweaks for middleware and subscribers.

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::StatusCode;

/// An incoming request.
pub type Request = http::Request<String>;

/// An outgoing response.
pub type Response = http::Response<String>;

/// Builds responses with the site's character encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFactory {
    charset: String,
}

impl ResponseFactory {
    /// Creates a factory for `charset`.
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: charset.into(),
        }
    }

    /// The character encoding stamped on HTML responses.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// The `Content-Type` of HTML responses.
    pub fn html_content_type(&self) -> String {
        format!("text/html; charset={}", self.charset)
    }

    /// An empty `200 OK` HTML response carrying the charset.
    pub fn empty(&self) -> Response {
        let mut response = Response::default();
        if let Ok(value) = HeaderValue::from_str(&self.html_content_type()) {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        response
    }

    /// A `200 OK` HTML response.
    pub fn html(&self, body: impl Into<String>) -> Result<Response, http::Error> {
        http::Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, self.html_content_type())
            .body(body.into())
    }

    /// A redirect to `url`.
    pub fn redirect(&self, url: &str, status: StatusCode) -> Result<Response, http::Error> {
        http::Response::builder()
            .status(status)
            .header(LOCATION, url)
            .body(String::new())
    }

    /// A plain-text error response. Never fails.
    pub fn error(&self, status: StatusCode) -> Response {
        let body = match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => status.as_u16().to_string(),
        };
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Builder-style adjustments to an existing response.
pub trait ResponseExt: Sized {
    /// Sets (replacing) a header.
    fn with_header(self, name: HeaderName, value: &str) -> Result<Self, http::Error>;

    /// Sets the status code.
    fn with_status(self, status: StatusCode) -> Self;
}

impl ResponseExt for Response {
    fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, http::Error> {
        let value = HeaderValue::from_str(value)?;
        self.headers_mut().insert(name, value);
        Ok(self)
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        *self.status_mut() = status;
        self
    }
}
