//! Content-encoding support for upstream response bodies
//!
//! The upstream advertises its compression through a single `Content-Encoding`
//! value. This module turns that value into a [`ContentEncoding`] and the
//! [`CodecRegistry`] into the bytes the JSON parser expects.
//!
//! ## Key Components
//!
//! - [`ContentEncoding`] - Parsed encoding token (`gzip`, `deflate`, `br`, `zstd`, identity)
//! - [`CodecRegistry`] - Encoding to decoder mapping, resolved once at startup
//! - [`CodecCapability`] - Whether a given decoder is usable on this process
//!
//! `gzip`, `deflate` and `br` are always compiled in. `zstd` sits behind the
//! `zstd` cargo feature and a startup probe; when either is missing, zstd
//! bodies fail with [`CodecError::Unavailable`] instead of being passed through.

pub mod algorithms;
mod registry;

pub use registry::{CodecCapability, CodecError, CodecRegistry, CodecStatus, DecodeFn};

use serde::Serialize;
use std::fmt;

/// Encoding declared by the upstream `Content-Encoding` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    #[serde(rename = "br")]
    Brotli,
    Zstd,
}

impl ContentEncoding {
    /// Parse the raw header value.
    ///
    /// Matching is case-sensitive. Absent, empty, or unrecognized values
    /// (including lists such as `gzip, br`) map to [`ContentEncoding::Identity`].
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("gzip") => ContentEncoding::Gzip,
            Some("deflate") => ContentEncoding::Deflate,
            Some("br") => ContentEncoding::Brotli,
            Some("zstd") => ContentEncoding::Zstd,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Brotli => "br",
            ContentEncoding::Zstd => "zstd",
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ContentEncoding::Identity)
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
