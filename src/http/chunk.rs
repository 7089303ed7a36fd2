//! Body chunks and their text encodings.
//!
//! # Responsibilities
//! - Represent a body write as raw bytes or as text with a declared encoding
//! - Normalize every chunk to a byte buffer before framing or capture
//!
//! # Design Decisions
//! - Latin-1, ASCII and UTF-16LE operate on UTF-16 code units, so a
//!   character outside the BMP becomes two units
//! - Hex decoding is strict; base64 accepts standard and URL-safe alphabets
//!   with or without padding

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::http::error::{ResponseError, ResponseResult};

/// Text encoding declared alongside a written string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
    Hex,
    Base64,
    Utf16Le,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin1",
            Encoding::Hex => "hex",
            Encoding::Base64 => "base64",
            Encoding::Utf16Le => "utf16le",
        }
    }

    /// Encode `text` into bytes.
    pub fn encode(&self, text: &str) -> ResponseResult<Bytes> {
        let bytes = match self {
            Encoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Encoding::Ascii | Encoding::Latin1 => {
                text.encode_utf16().map(|unit| unit as u8).collect::<Vec<u8>>().into()
            }
            Encoding::Utf16Le => text
                .encode_utf16()
                .flat_map(u16::to_le_bytes)
                .collect::<Vec<u8>>()
                .into(),
            Encoding::Hex => hex::decode(text)
                .map_err(|e| self.invalid(e.to_string()))?
                .into(),
            Encoding::Base64 => {
                let cleaned: String = text
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let cleaned = cleaned.trim_end_matches('=');
                STANDARD_NO_PAD
                    .decode(cleaned)
                    .or_else(|_| URL_SAFE_NO_PAD.decode(cleaned))
                    .map_err(|e| self.invalid(e.to_string()))?
                    .into()
            }
        };
        Ok(bytes)
    }

    fn invalid(&self, reason: String) -> ResponseError {
        ResponseError::InvalidEncoding {
            encoding: self.as_str(),
            reason,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an encoding label nobody recognizes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown encoding: {0}")]
pub struct UnknownEncoding(pub String);

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "ascii" => Ok(Encoding::Ascii),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            "hex" => Ok(Encoding::Hex),
            "base64" | "base64url" => Ok(Encoding::Base64),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

/// A single body write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Bytes(Bytes),
    Text { text: String, encoding: Encoding },
}

impl Chunk {
    /// Text chunk with an explicit encoding.
    pub fn text(text: impl Into<String>, encoding: Encoding) -> Self {
        Chunk::Text {
            text: text.into(),
            encoding,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Chunk::Bytes(bytes) => bytes.is_empty(),
            Chunk::Text { text, .. } => text.is_empty(),
        }
    }

    /// Normalize to bytes according to the declared encoding.
    pub fn into_bytes(self) -> ResponseResult<Bytes> {
        match self {
            Chunk::Bytes(bytes) => Ok(bytes),
            Chunk::Text { text, encoding } => encoding.encode(&text),
        }
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Chunk::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk::Bytes(bytes.into())
    }
}

impl From<&'static [u8]> for Chunk {
    fn from(bytes: &'static [u8]) -> Self {
        Chunk::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::text(text, Encoding::Utf8)
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::text(text, Encoding::Utf8)
    }
}
