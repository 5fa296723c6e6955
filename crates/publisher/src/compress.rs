//! Gzip compression of the final artifact bytes.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use bundler::BuildError;

use crate::error::{PublishError, Result};

pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(bytes)
        .map_err(|e| PublishError::Build(BuildError::Io(e)))?;
    encoder
        .finish()
        .map_err(|e| PublishError::Build(BuildError::Io(e)))
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PublishError::Build(BuildError::Io(e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &[u8]) {
        let compressed = compress(input).unwrap();
        let restored = decompress(&compressed).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn test_round_trip_empty() {
        round_trip(b"");
    }

    #[test]
    fn test_round_trip_single_byte() {
        round_trip(b"x");
    }

    #[test]
    fn test_round_trip_multi_megabyte() {
        let input: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
        round_trip(&input);
    }

    #[test]
    fn test_compression_shrinks_redundant_code() {
        let input = "export function allowRead() { return true; }\n".repeat(1000);
        let compressed = compress(input.as_bytes()).unwrap();
        assert!(compressed.len() < input.len());
    }

    #[test]
    fn test_corrupt_input_fails() {
        assert!(decompress(b"definitely not gzip").is_err());
    }
}
