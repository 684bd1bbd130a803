//! Rendered response state handed to after-render middleware

use crate::middleware::Body;
use bytes::Bytes;
use http::{header, response::Parts, HeaderMap, Response};
use http_body_util::{BodyExt, Full};

/// Whether the handler has finished rendering the response body
///
/// Handlers that hand back a response before its body is final insert
/// `RenderStatus::Pending` into the response extensions. A response without
/// the extension is treated as fully rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderStatus {
    /// The body buffer holds the complete payload
    #[default]
    Complete,
    /// The body is still being produced
    Pending,
}

/// Per-request view of a rendered response
///
/// Owns the buffered body and the headers while middleware works on them.
/// The rest of the response (status line, extensions) stays in the
/// [`Parts`] returned by [`ResponseState::from_response`].
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    body: Option<Bytes>,
    headers: HeaderMap,
    status: RenderStatus,
}

impl ResponseState {
    /// Create a response state from its pieces
    pub fn new(body: Option<Bytes>, headers: HeaderMap, status: RenderStatus) -> Self {
        Self {
            body,
            headers,
            status,
        }
    }

    /// Fully rendered body with no headers
    pub fn rendered(body: impl Into<Bytes>) -> Self {
        Self::new(Some(body.into()), HeaderMap::new(), RenderStatus::Complete)
    }

    /// Split a buffered response into its parts and a response state
    pub async fn from_response(response: Response<Body>) -> (Parts, Self) {
        let (mut parts, body) = response.into_parts();

        let bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        let status = parts
            .extensions
            .get::<RenderStatus>()
            .copied()
            .unwrap_or_default();
        let headers = std::mem::take(&mut parts.headers);
        let body = (!bytes.is_empty()).then_some(bytes);

        (parts, Self::new(body, headers, status))
    }

    /// Reassemble a response from parts taken by [`ResponseState::from_response`]
    pub fn into_response(self, mut parts: Parts) -> Response<Body> {
        parts.headers = self.headers;
        Response::from_parts(parts, Full::new(self.body.unwrap_or_default()))
    }

    /// Rendered body, if anything was rendered
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Replace the body with a new payload
    pub fn replace_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Declared content type, parameters included
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Render status reported by the handler
    pub fn render_status(&self) -> RenderStatus {
        self.status
    }

    /// Whether rendering has completed
    pub fn is_rendered(&self) -> bool {
        self.status == RenderStatus::Complete
    }
}
