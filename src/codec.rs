//! Base64 and zlib/gzip handling for `<data encoding="base64">` payloads.

use std::fmt;
use std::io::{self, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::{Decompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INFLATE_CHUNK: usize = 16 * 1024;

/// Compression applied to a base64 tile payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain base64.
    #[default]
    None,
    /// zlib stream (RFC 1950).
    Zlib,
    /// gzip member (RFC 1952).
    Gzip,
}

impl Compression {
    /// Maps the value of a `compression` attribute. `None` means the tag is
    /// not one this crate can inflate.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "" => Some(Compression::None),
            "zlib" => Some(Compression::Zlib),
            "gzip" => Some(Compression::Gzip),
            _ => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "uncompressed"),
            Compression::Zlib => write!(f, "zlib"),
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}

/// Why a payload was rejected.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Character outside the base64 alphabet, or bad padding.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The compressed stream is corrupt, truncated or followed by junk.
    #[error("{compression} stream is corrupt: {reason}")]
    Decompress {
        /// Compression that was being undone.
        compression: Compression,
        /// What the inflater reported.
        reason: String,
    },

    /// The compressed stream inflates past the size the caller allows.
    #[error("{compression} stream inflates past {limit} bytes")]
    Oversized {
        /// Compression that was being undone.
        compression: Compression,
        /// Largest accepted output, in bytes.
        limit: usize,
    },

    /// The decoded payload is not a whole number of 32-bit gids.
    #[error("payload of {0} bytes is not a whole number of 32-bit values")]
    Misaligned(usize),
}

/// Decodes base64 `text` and undoes `compression`.
///
/// ASCII whitespace anywhere in `text` is ignored, since editors wrap the
/// payload over several indented lines. The result is guaranteed to have a
/// length divisible by 4.
pub fn decode(text: &str, compression: Compression) -> Result<Vec<u8>, CodecError> {
    decode_with_limit(text, compression, usize::MAX)
}

/// Like [`decode`], but inflation stops with [`CodecError::Oversized`] once
/// the output would exceed `max_len` bytes.
///
/// The limit only bounds decompression; an uncompressed payload is never
/// larger than its base64 text.
pub fn decode_with_limit(text: &str, compression: Compression, max_len: usize) -> Result<Vec<u8>, CodecError> {
    let compact: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let raw = STANDARD.decode(&compact)?;

    let bytes = match compression {
        Compression::None => raw,
        Compression::Zlib => inflate_zlib(&raw, max_len)?,
        Compression::Gzip => inflate_gzip(&raw, max_len)?,
    };

    if bytes.len() % 4 != 0 {
        return Err(CodecError::Misaligned(bytes.len()));
    }
    Ok(bytes)
}

/// Inverse of [`decode`]: compresses `bytes` and encodes them as base64.
pub fn encode(bytes: &[u8], compression: Compression) -> io::Result<String> {
    let packed = match compression {
        Compression::None => bytes.to_vec(),
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
    };
    Ok(STANDARD.encode(packed))
}

/// Reinterprets a byte buffer as little-endian gids. Trailing bytes that do
/// not form a whole value are ignored; [`decode`] never produces them.
pub fn gids_from_le_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Little-endian byte image of `gids`.
pub fn gids_to_le_bytes(gids: &[u32]) -> Vec<u8> {
    gids.iter().flat_map(|gid| gid.to_le_bytes()).collect()
}

// flate2's `ZlibDecoder` reports a truncated stream as a clean EOF, so the
// stream end is checked by hand here.
fn inflate_zlib(input: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
    let corrupt = |reason: String| CodecError::Decompress {
        compression: Compression::Zlib,
        reason,
    };

    let mut inflater = Decompress::new(true);
    let initial = input
        .len()
        .saturating_mul(4)
        .max(INFLATE_CHUNK)
        .min(max_len.saturating_add(1));
    let mut out = Vec::with_capacity(initial);
    loop {
        if out.len() == out.capacity() {
            out.reserve_exact(INFLATE_CHUNK);
        }
        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let status = inflater
            .decompress_vec(&input[before_in as usize..], &mut out, FlushDecompress::None)
            .map_err(|e| corrupt(e.to_string()))?;

        if out.len() > max_len {
            return Err(CodecError::Oversized {
                compression: Compression::Zlib,
                limit: max_len,
            });
        }
        if status == Status::StreamEnd {
            break;
        }
        let stalled = inflater.total_in() == before_in && inflater.total_out() == before_out;
        if stalled && out.len() < out.capacity() {
            return Err(corrupt("stream is truncated".to_owned()));
        }
    }

    let trailing = input.len() - inflater.total_in() as usize;
    if trailing != 0 {
        return Err(corrupt(format!("{trailing} trailing bytes after end of stream")));
    }
    Ok(out)
}

fn inflate_gzip(input: &[u8], max_len: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    // one byte past the limit is enough to tell an oversized stream apart
    let cap = u64::try_from(max_len).unwrap_or(u64::MAX).saturating_add(1);
    GzDecoder::new(input)
        .take(cap)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress {
            compression: Compression::Gzip,
            reason: e.to_string(),
        })?;
    if out.len() > max_len {
        return Err(CodecError::Oversized {
            compression: Compression::Gzip,
            limit: max_len,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: [u32; 6] = [1, 0, 0x8000_0005, 17, 2, 0];

    #[test]
    fn round_trips_every_compression() {
        let bytes = gids_to_le_bytes(&GRID);
        for compression in [Compression::None, Compression::Zlib, Compression::Gzip] {
            let text = encode(&bytes, compression).expect("encode");
            let decoded = decode(&text, compression).expect("decode");
            assert_eq!(gids_from_le_bytes(&decoded), GRID, "{compression}");
        }
    }

    #[test]
    fn ignores_whitespace_and_line_breaks() {
        let text = encode(&gids_to_le_bytes(&GRID), Compression::None).expect("encode");
        let (head, tail) = text.split_at(7);
        let wrapped = format!("\n   {head}\n\t {tail}  \n");
        let decoded = decode(&wrapped, Compression::None).expect("decode");
        assert_eq!(gids_from_le_bytes(&decoded), GRID);
    }

    #[test]
    fn rejects_characters_outside_the_alphabet() {
        let err = decode("AQAA%AAA", Compression::None).unwrap_err();
        assert!(matches!(err, CodecError::Base64(_)));
    }

    #[test]
    fn rejects_payload_not_made_of_u32() {
        // three bytes
        let text = STANDARD.encode([1u8, 2, 3]);
        let err = decode(&text, Compression::None).unwrap_err();
        assert!(matches!(err, CodecError::Misaligned(3)));
    }

    #[test]
    fn rejects_corrupt_zlib_stream() {
        let text = STANDARD.encode([0x78u8, 0x9c, 0xff, 0xff, 0xff, 0xff]);
        let err = decode(&text, Compression::Zlib).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decompress {
                compression: Compression::Zlib,
                ..
            }
        ));
    }

    #[test]
    fn rejects_truncated_streams() {
        let bytes = gids_to_le_bytes(&[7u32; 64]);
        for compression in [Compression::Zlib, Compression::Gzip] {
            let full = STANDARD.decode(encode(&bytes, compression).expect("encode")).expect("b64");
            let cut = STANDARD.encode(&full[..full.len() - 6]);
            let err = decode(&cut, compression).unwrap_err();
            assert!(matches!(err, CodecError::Decompress { .. }), "{compression}");
        }
    }

    #[test]
    fn rejects_trailing_bytes_after_zlib_stream() {
        let mut full = STANDARD
            .decode(encode(&gids_to_le_bytes(&GRID), Compression::Zlib).expect("encode"))
            .expect("b64");
        full.extend_from_slice(&[0, 0, 0, 0]);
        let err = decode(&STANDARD.encode(full), Compression::Zlib).unwrap_err();
        assert!(matches!(err, CodecError::Decompress { .. }));
    }

    #[test]
    fn stops_inflating_past_the_limit() {
        let bytes = vec![0u8; 1 << 20];
        for compression in [Compression::Zlib, Compression::Gzip] {
            let text = encode(&bytes, compression).expect("encode");
            let err = decode_with_limit(&text, compression, 64).unwrap_err();
            assert!(
                matches!(err, CodecError::Oversized { limit: 64, .. }),
                "{compression}: {err:?}"
            );
            // exactly at the limit is fine
            let exact = decode_with_limit(&text, compression, bytes.len()).expect("decode");
            assert_eq!(exact.len(), bytes.len());
        }
    }

    #[test]
    fn maps_compression_tags() {
        assert_eq!(Compression::from_tag("zlib"), Some(Compression::Zlib));
        assert_eq!(Compression::from_tag("gzip"), Some(Compression::Gzip));
        assert_eq!(Compression::from_tag(""), Some(Compression::None));
        assert_eq!(Compression::from_tag("zstd"), None);
    }
}
