//! Configuration for the compression gate

use brgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Highest quality the Brotli encoder accepts
pub const MAX_QUALITY: u32 = 11;

/// Window sizes (lgwin) the Brotli encoder accepts
pub const WINDOW_BITS_RANGE: RangeInclusive<u32> = 10..=24;

/// Gate configuration
///
/// Built once at startup with the chaining setters below, then handed to
/// [`Gate`](crate::Gate). The setters take `self` by value, so they cannot
/// run once the gate is shared between request tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// MIME types eligible for compression, without parameters.
    /// An empty list accepts any type.
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,

    /// Minimum body size to compress (in bytes)
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    /// Encoder quality (0-11, higher is smaller and slower)
    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Encoder window size as a base-2 log (10-24)
    #[serde(default = "default_window_bits")]
    pub window_bits: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            content_types: default_content_types(),
            min_size: default_min_size(),
            quality: default_quality(),
            window_bits: default_window_bits(),
        }
    }
}

fn default_content_types() -> Vec<String> {
    [
        "application/javascript",
        "application/json",
        "application/xml",
        "text/javascript",
        "text/json",
        "text/xml",
        "text/plain",
        "text/css",
        "text/html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_min_size() -> usize {
    1024
}

fn default_quality() -> u32 {
    6
}

fn default_window_bits() -> u32 {
    22
}

impl GateConfig {
    /// Replace the content-type allowlist
    #[must_use]
    pub fn content_type<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = content_types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the minimum body size
    #[must_use]
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the encoder quality
    #[must_use]
    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    /// Set the encoder window size
    #[must_use]
    pub fn window_bits(mut self, window_bits: u32) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Check if a body of this size clears the threshold
    pub fn meets_min_size(&self, size: usize) -> bool {
        size >= self.min_size
    }

    /// Check if a normalized content type is on the allowlist
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        self.content_types.is_empty()
            || self
                .content_types
                .iter()
                .any(|allowed| allowed.trim().eq_ignore_ascii_case(content_type))
    }

    /// Validate encoder parameters
    ///
    /// The setters accept anything; files go through this on load.
    pub fn validate(&self) -> Result<()> {
        if self.quality > MAX_QUALITY {
            return Err(Error::config(format!(
                "quality {} exceeds maximum of {MAX_QUALITY}",
                self.quality
            )));
        }

        if !WINDOW_BITS_RANGE.contains(&self.window_bits) {
            return Err(Error::config(format!(
                "window_bits {} outside {}..={}",
                self.window_bits,
                WINDOW_BITS_RANGE.start(),
                WINDOW_BITS_RANGE.end()
            )));
        }

        if self.content_types.iter().any(|ct| ct.contains(';')) {
            return Err(Error::config(
                "content_types entries must not carry parameters",
            ));
        }

        Ok(())
    }
}
