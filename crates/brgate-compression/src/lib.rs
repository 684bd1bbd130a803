//! Brotli compression gate for brgate
//!
//! Compresses fully rendered response bodies on their way out:
//! - Accept-Encoding check (substring match on `br`)
//! - Minimum size threshold
//! - Content-type allowlist
//! - Configurable quality and window size
//! - `Content-Encoding`, `Vary` and `Content-Length` handling
//!
//! Body and headers are only rewritten once the encoder has succeeded.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod config;
pub mod content_type;
pub mod encoder;
pub mod gate;
pub mod loader;

pub use config::GateConfig;
pub use content_type::{normalize_content_type, OCTET_STREAM};
pub use encoder::{BrotliEncoder, Encoder, BROTLI_ENCODING};
pub use gate::{Gate, Outcome, SkipReason};
pub use loader::{load_from_file, load_from_str, ConfigFormat};
