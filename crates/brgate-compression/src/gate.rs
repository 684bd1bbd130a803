//! The compression gate
//!
//! Runs after the handler has rendered the response, decides whether the
//! buffered body should be Brotli-encoded, and rewrites body and headers when
//! it is.

use crate::config::GateConfig;
use crate::content_type::{normalize_content_type, OCTET_STREAM};
use crate::encoder::{BrotliEncoder, Encoder, BROTLI_ENCODING};
use async_trait::async_trait;
use brgate_core::{Body, Middleware, Next, ResponseState, Result};
use bytes::Bytes;
use http::{header, HeaderValue, Request, Response};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, dispatcher, trace, warn, Dispatch};

/// Why a response was left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The request did not offer `br`
    NotAccepted,
    /// The handler has not finished rendering
    NotRendered,
    /// The response already carries a `Content-Encoding`
    AlreadyEncoded,
    /// Nothing was rendered
    EmptyBody,
    /// The body is under the configured threshold
    BelowMinSize {
        /// Body length in bytes
        size: usize,
        /// Configured threshold
        min_size: usize,
    },
    /// The normalized content type is not on the allowlist
    ContentTypeNotAllowed(String),
}

/// Result of running the gate over one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Body replaced with its encoded form
    Compressed {
        /// Length before encoding
        original: usize,
        /// Length after encoding
        compressed: usize,
    },
    /// Response left untouched
    Skipped(SkipReason),
    /// The encoder failed; response left untouched
    Failed,
}

/// Brotli compression gate
///
/// Configure it with the setters, then register it in the middleware stack.
/// Once it sits behind an `Arc` the configuration is read-only, so request
/// tasks share it without locking.
#[derive(Clone)]
pub struct Gate {
    config: Arc<GateConfig>,
    encoder: Arc<dyn Encoder>,
    dispatch: Dispatch,
}

impl Gate {
    /// Create a gate with the default configuration
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    /// Create a gate with a custom configuration
    ///
    /// Events go to the dispatcher that is current at this call.
    pub fn with_config(config: GateConfig) -> Self {
        Self {
            config: Arc::new(config),
            encoder: Arc::new(BrotliEncoder),
            dispatch: dispatcher::get_default(Dispatch::clone),
        }
    }

    /// Use a different encoder
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Send this gate's events to `dispatch`
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replace the content-type allowlist
    #[must_use]
    pub fn content_type<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.config).content_types =
            content_types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the minimum body size
    #[must_use]
    pub fn min_size(mut self, min_size: usize) -> Self {
        Arc::make_mut(&mut self.config).min_size = min_size;
        self
    }

    /// Set the encoder quality
    #[must_use]
    pub fn quality(mut self, quality: u32) -> Self {
        Arc::make_mut(&mut self.config).quality = quality;
        self
    }

    /// Set the encoder window size
    #[must_use]
    pub fn window_bits(mut self, window_bits: u32) -> Self {
        Arc::make_mut(&mut self.config).window_bits = window_bits;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Check whether the request offered Brotli
    ///
    /// Plain substring match on the header value, no q-values or wildcards.
    pub fn accepts(accept_encoding: Option<&HeaderValue>) -> bool {
        accept_encoding
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains(BROTLI_ENCODING))
    }

    /// Decide whether a response should be compressed
    ///
    /// Returns the body to encode when it should.
    pub fn check(
        &self,
        accept_encoding: Option<&HeaderValue>,
        state: &ResponseState,
    ) -> std::result::Result<Bytes, SkipReason> {
        if !Self::accepts(accept_encoding) {
            return Err(SkipReason::NotAccepted);
        }

        if !state.is_rendered() {
            return Err(SkipReason::NotRendered);
        }

        if state.headers().contains_key(header::CONTENT_ENCODING) {
            return Err(SkipReason::AlreadyEncoded);
        }

        let body = match state.body() {
            Some(body) if !body.is_empty() => body,
            _ => return Err(SkipReason::EmptyBody),
        };
        let size = body.len();

        if !self.config.meets_min_size(size) {
            return Err(SkipReason::BelowMinSize {
                size,
                min_size: self.config.min_size,
            });
        }

        let content_type = normalize_content_type(state.content_type().unwrap_or_default());
        if !self.config.allows_content_type(content_type) {
            return Err(SkipReason::ContentTypeNotAllowed(content_type.to_string()));
        }

        Ok(body.clone())
    }

    /// Compress the rendered body in place if the response is eligible
    ///
    /// Body and headers change together, and only after the encoder has
    /// succeeded. Encoder failures are logged and leave the response as it
    /// was.
    pub fn apply(
        &self,
        accept_encoding: Option<&HeaderValue>,
        state: &mut ResponseState,
    ) -> Outcome {
        dispatcher::with_default(&self.dispatch, || self.compress(accept_encoding, state))
    }

    fn compress(&self, accept_encoding: Option<&HeaderValue>, state: &mut ResponseState) -> Outcome {
        let body = match self.check(accept_encoding, state) {
            Ok(body) => body,
            Err(reason) => {
                trace!(reason = ?reason, "Skipping response compression");
                return Outcome::Skipped(reason);
            }
        };

        let compressed = match self
            .encoder
            .encode(&body, self.config.quality, self.config.window_bits)
        {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!(
                    error = %e,
                    size = body.len(),
                    quality = self.config.quality,
                    window_bits = self.config.window_bits,
                    "Brotli encoding failed, sending response uncompressed"
                );
                return Outcome::Failed;
            }
        };

        let original = body.len();
        let compressed_len = compressed.len();

        let headers = state.headers_mut();
        headers.insert(
            header::VARY,
            HeaderValue::from_static("Content-Encoding"),
        );
        headers.insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(BROTLI_ENCODING),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(compressed_len));
        headers.remove(header::TRANSFER_ENCODING);

        let blank_content_type = headers
            .get(header::CONTENT_TYPE)
            .map_or(true, |v| v.as_bytes().iter().all(u8::is_ascii_whitespace));
        if blank_content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        }

        state.replace_body(compressed);

        debug!(
            original,
            compressed = compressed_len,
            "Response compressed with brotli"
        );

        Outcome::Compressed {
            original,
            compressed: compressed_len,
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("content_types", &self.config.content_types)
            .field("min_size", &self.config.min_size)
            .field("quality", &self.config.quality)
            .field("window_bits", &self.config.window_bits)
            .field("encoder", &self.encoder)
            .finish()
    }
}

#[async_trait]
impl Middleware for Gate {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        let accept_encoding = req.headers().get(header::ACCEPT_ENCODING).cloned();

        let response = next.run(req).await?;

        // Skip buffering the body when the client cannot take br anyway
        if !Self::accepts(accept_encoding.as_ref()) {
            return Ok(response);
        }

        let (parts, mut state) = ResponseState::from_response(response).await;
        self.apply(accept_encoding.as_ref(), &mut state);

        Ok(state.into_response(parts))
    }
}
