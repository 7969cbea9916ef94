//! Best-effort text decoding of a file prefix.
//!
//! The encoding of files in the DAM is unknown, and a preview only needs
//! something the lexer can chew on. Candidates are tried strictly first, then
//! leniently, and as a last resort printable ASCII is salvaged. Decoding never
//! fails.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::fmt;

/// Text encodings tried, in order, when decoding a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Ascii,
    Utf16,
    Utf32,
}

/// Candidate order for both the strict and the lenient pass.
pub const CANDIDATES: [TextEncoding; 5] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Ascii,
    TextEncoding::Utf16,
    TextEncoding::Utf32,
];

/// Result of decoding a file prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// The decoded text
    pub text: String,
    /// Encoding that produced `text`; `None` for the printable-ASCII salvage path
    pub encoding: Option<TextEncoding>,
    /// Whether undecodable sequences were replaced or dropped
    pub lossy: bool,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Utf16 => "utf-16",
            TextEncoding::Utf32 => "utf-32",
        };
        f.write_str(name)
    }
}

impl TextEncoding {
    /// Decode without tolerating any malformed input.
    pub fn decode_strict(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => decode_utf8_prefix(strip_utf8_bom(bytes)),
            // Every byte maps to a code point, so this never fails.
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            TextEncoding::Ascii => std::str::from_utf8(bytes)
                .ok()
                .filter(|s| s.is_ascii())
                .map(str::to_owned),
            TextEncoding::Utf16 => {
                let (encoding, body) = utf16_flavor(bytes);
                encoding
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(|s| s.into_owned())
            }
            TextEncoding::Utf32 => {
                let (big_endian, body) = utf32_flavor(bytes);
                if body.len() % 4 != 0 {
                    return None;
                }
                body.chunks_exact(4)
                    .map(|chunk| char::from_u32(utf32_unit(chunk, big_endian)))
                    .collect()
            }
        }
    }

    /// Decode, replacing malformed sequences with U+FFFD.
    pub fn decode_lossy(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => Some(String::from_utf8_lossy(strip_utf8_bom(bytes)).into_owned()),
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            TextEncoding::Ascii => Some(
                bytes
                    .iter()
                    .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                    .collect(),
            ),
            TextEncoding::Utf16 => {
                let (encoding, body) = utf16_flavor(bytes);
                Some(encoding.decode_without_bom_handling(body).0.into_owned())
            }
            TextEncoding::Utf32 => {
                let (big_endian, body) = utf32_flavor(bytes);
                let chunks = body.chunks_exact(4);
                let trailing = !chunks.remainder().is_empty();
                let mut text: String = chunks
                    .map(|chunk| {
                        char::from_u32(utf32_unit(chunk, big_endian))
                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                    })
                    .collect();
                if trailing {
                    text.push(char::REPLACEMENT_CHARACTER);
                }
                Some(text)
            }
        }
    }
}

/// Decode a file prefix into text for lexing.
///
/// 1. Strict pass over [`CANDIDATES`], skipping whitespace-only results.
/// 2. Lenient pass over the same list, first success wins.
/// 3. Printable ASCII salvage, which cannot fail.
pub fn decode_preview(bytes: &[u8]) -> DecodedText {
    for encoding in CANDIDATES {
        if let Some(text) = encoding.decode_strict(bytes) {
            if !is_blank(&text) {
                tracing::trace!("Decoded {} bytes as {}", bytes.len(), encoding);
                return DecodedText {
                    text,
                    encoding: Some(encoding),
                    lossy: false,
                };
            }
        }
    }

    tracing::debug!(
        "No strict decoding produced text for {} bytes, retrying leniently",
        bytes.len()
    );

    for encoding in CANDIDATES {
        if let Some(text) = encoding.decode_lossy(bytes) {
            return DecodedText {
                text,
                encoding: Some(encoding),
                lossy: true,
            };
        }
    }

    tracing::debug!("Decode exhaustion, salvaging printable ASCII");
    DecodedText {
        text: printable_ascii(bytes),
        encoding: None,
        lossy: true,
    }
}

/// Keep only printable ASCII (graphic characters plus ordinary whitespace).
pub fn printable_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| b.is_ascii_graphic() || matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .map(|&b| b as char)
        .collect()
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// Strict UTF-8 that tolerates a multi-byte sequence cut off by the read limit.
fn decode_utf8_prefix(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Some(s.to_owned()),
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&bytes[..e.valid_up_to()])
            .ok()
            .map(str::to_owned),
        Err(_) => None,
    }
}

fn utf16_flavor(bytes: &[u8]) -> (&'static Encoding, &[u8]) {
    match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) if encoding == UTF_16LE || encoding == UTF_16BE => {
            (encoding, &bytes[bom_len..])
        }
        _ => (UTF_16LE, bytes),
    }
}

fn utf32_flavor(bytes: &[u8]) -> (bool, &[u8]) {
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE, 0x00, 0x00]) {
        (false, body)
    } else if let Some(body) = bytes.strip_prefix(&[0x00, 0x00, 0xFE, 0xFF]) {
        (true, body)
    } else {
        (false, bytes)
    }
}

fn utf32_unit(chunk: &[u8], big_endian: bool) -> u32 {
    let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
    if big_endian {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    }
}
