//! # brgate Core
//!
//! Core types, traits, and error handling shared by the brgate crates.
//!
//! This crate models the host side of a response pipeline:
//! - Middleware trait and the `Next` chain
//! - Rendered response state handed to after-render middleware
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod middleware;
pub mod response;

pub use error::{Error, Result};
pub use middleware::{Body, Middleware, Next};
pub use response::{RenderStatus, ResponseState};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::middleware::{Body, Middleware, Next};
    pub use crate::response::{RenderStatus, ResponseState};
}
