//! Encoder sessions

use crate::config::{MAX_QUALITY, WINDOW_BITS_RANGE};
use bytes::Bytes;
use std::fmt;
use std::io::{self, Write};

/// Content-Encoding token produced by [`BrotliEncoder`]
pub const BROTLI_ENCODING: &str = "br";

/// Internal buffer size for the streaming encoder
const ENCODER_BUFFER_SIZE: usize = 4096;

/// One-shot buffer-to-buffer encoder
///
/// Each call opens a session, writes the whole input, flushes, and closes the
/// session before returning, whether or not the write succeeded.
#[cfg_attr(test, mockall::automock)]
pub trait Encoder: Send + Sync + fmt::Debug {
    /// Encode `input` with the given quality and window size
    fn encode(&self, input: &[u8], quality: u32, window_bits: u32) -> io::Result<Bytes>;
}

/// Brotli encoder backed by the `brotli` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BrotliEncoder;

impl Encoder for BrotliEncoder {
    fn encode(&self, input: &[u8], quality: u32, window_bits: u32) -> io::Result<Bytes> {
        let quality = quality.min(MAX_QUALITY);
        let lgwin = window_bits.clamp(*WINDOW_BITS_RANGE.start(), *WINDOW_BITS_RANGE.end());

        let mut output = Vec::with_capacity(input.len() / 2);

        {
            // Dropping the writer closes the session and emits the final block,
            // including on the error paths below.
            let mut session =
                brotli::CompressorWriter::new(&mut output, ENCODER_BUFFER_SIZE, quality, lgwin);
            session.write_all(input)?;
            session.flush()?;
        }

        Ok(Bytes::from(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Read;

    fn decompress(data: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        brotli::Decompressor::new(data, ENCODER_BUFFER_SIZE)
            .read_to_end(&mut output)
            .unwrap();
        output
    }

    #[test]
    fn test_encode_decodes_back() {
        let data = "Hello, World! This is a test string that should compress well. ".repeat(100);
        let compressed = BrotliEncoder.encode(data.as_bytes(), 6, 22).unwrap();

        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed), data.as_bytes());
    }

    #[test]
    fn test_out_of_range_parameters_are_clamped() {
        let data = b"{\"id\":1,\"name\":\"widget\"}".repeat(50);
        let compressed = BrotliEncoder.encode(&data, 99, 64).unwrap();
        assert_eq!(decompress(&compressed), data);

        let compressed = BrotliEncoder.encode(&data, 0, 0).unwrap();
        assert_eq!(decompress(&compressed), data);
    }

    #[test]
    fn test_compression_ratio() {
        let data = "a".repeat(10_000);
        let best = BrotliEncoder.encode(data.as_bytes(), 11, 22).unwrap();
        assert!(best.len() < data.len() / 10);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_input_round_trips(
            data in prop::collection::vec(any::<u8>(), 0..20_000),
            quality in 0u32..=MAX_QUALITY,
            window_bits in WINDOW_BITS_RANGE,
        ) {
            let compressed = BrotliEncoder.encode(&data, quality, window_bits).unwrap();
            prop_assert_eq!(decompress(&compressed), data);
        }
    }
}
