use std::borrow::Cow;
use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::ContentEncoding;
use super::algorithms;

/// Decompression entry point shared by all codecs
pub type DecodeFn = fn(&[u8]) -> io::Result<Vec<u8>>;

/// Whether a codec can be used by this process
#[derive(Clone, Copy)]
pub enum CodecCapability {
    Available(DecodeFn),
    Unavailable,
}

impl CodecCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, CodecCapability::Available(_))
    }
}

impl fmt::Debug for CodecCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecCapability::Available(_) => f.write_str("Available"),
            CodecCapability::Unavailable => f.write_str("Unavailable"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{encoding} codec unavailable")]
    Unavailable { encoding: ContentEncoding },

    #[error("corrupt {encoding} stream: {source}")]
    Corrupt {
        encoding: ContentEncoding,
        #[source]
        source: io::Error,
    },
}

/// Per-encoding availability, as reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodecStatus {
    pub gzip: bool,
    pub deflate: bool,
    pub br: bool,
    pub zstd: bool,
}

/// Maps content encodings to decoders.
///
/// Built once at startup and never re-probed; cheap to copy into every
/// component that needs it.
#[derive(Debug, Clone, Copy)]
pub struct CodecRegistry {
    zstd: CodecCapability,
}

impl CodecRegistry {
    /// Resolve the optional codec.
    ///
    /// `zstd_enabled` comes from configuration; even when enabled, zstd is
    /// only marked available if the library is compiled in and passes a
    /// round-trip probe.
    pub fn probe(zstd_enabled: bool) -> Self {
        let zstd = if zstd_enabled {
            probe_zstd()
        } else {
            info!("zstd decoding disabled by configuration");
            CodecCapability::Unavailable
        };

        Self { zstd }
    }

    /// Registry with only the built-in codecs
    pub fn builtin_only() -> Self {
        Self {
            zstd: CodecCapability::Unavailable,
        }
    }

    /// Capability for a given encoding. Identity has no codec.
    pub fn capability(&self, encoding: ContentEncoding) -> Option<CodecCapability> {
        match encoding {
            ContentEncoding::Identity => None,
            ContentEncoding::Gzip => Some(CodecCapability::Available(algorithms::decode_gzip)),
            ContentEncoding::Deflate => {
                Some(CodecCapability::Available(algorithms::decode_deflate))
            }
            ContentEncoding::Brotli => {
                Some(CodecCapability::Available(algorithms::decode_brotli))
            }
            ContentEncoding::Zstd => Some(self.zstd),
        }
    }

    /// Decode `data` according to `encoding`.
    ///
    /// Identity returns the input slice untouched.
    pub fn decode<'a>(
        &self,
        encoding: ContentEncoding,
        data: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, CodecError> {
        match self.capability(encoding) {
            None => Ok(Cow::Borrowed(data)),
            Some(CodecCapability::Unavailable) => Err(CodecError::Unavailable { encoding }),
            Some(CodecCapability::Available(decode)) => decode(data)
                .map(Cow::Owned)
                .map_err(|source| CodecError::Corrupt { encoding, source }),
        }
    }

    pub fn zstd_available(&self) -> bool {
        self.zstd.is_available()
    }

    pub fn status(&self) -> CodecStatus {
        CodecStatus {
            gzip: true,
            deflate: true,
            br: true,
            zstd: self.zstd_available(),
        }
    }
}

#[cfg(feature = "zstd")]
fn probe_zstd() -> CodecCapability {
    match algorithms::zstd_probe() {
        Ok(()) => {
            info!("zstd codec available");
            CodecCapability::Available(algorithms::decode_zstd)
        }
        Err(e) => {
            warn!(error = %e, "zstd codec failed its startup probe, zstd bodies will be rejected");
            CodecCapability::Unavailable
        }
    }
}

#[cfg(not(feature = "zstd"))]
fn probe_zstd() -> CodecCapability {
    warn!("zstd support not compiled in, zstd bodies will be rejected");
    CodecCapability::Unavailable
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_identity_borrows_input() {
        let registry = CodecRegistry::builtin_only();
        let data = b"{\"a\":1}";

        let decoded = registry.decode(ContentEncoding::Identity, data).unwrap();
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded.as_ref(), data);
    }

    #[test]
    fn test_gzip_through_registry() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"[1,2,3]").unwrap();
        let compressed = encoder.finish().unwrap();

        let registry = CodecRegistry::builtin_only();
        let decoded = registry.decode(ContentEncoding::Gzip, &compressed).unwrap();
        assert_eq!(decoded.as_ref(), b"[1,2,3]");
    }

    #[test]
    fn test_corrupt_stream_reports_encoding() {
        let registry = CodecRegistry::builtin_only();

        let err = registry
            .decode(ContentEncoding::Gzip, b"not a gzip stream")
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Corrupt {
                encoding: ContentEncoding::Gzip,
                ..
            }
        ));
    }

    #[test]
    fn test_unavailable_zstd_is_not_passed_through() {
        let registry = CodecRegistry::builtin_only();
        assert!(!registry.zstd_available());

        let err = registry
            .decode(ContentEncoding::Zstd, b"{\"a\":1}")
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Unavailable {
                encoding: ContentEncoding::Zstd
            }
        ));
    }

    #[test]
    fn test_probe_respects_configuration() {
        let registry = CodecRegistry::probe(false);
        assert!(!registry.zstd_available());
        assert!(!registry.status().zstd);
        assert!(registry.status().gzip);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_probe_enables_zstd_when_compiled_in() {
        let registry = CodecRegistry::probe(true);
        assert!(registry.zstd_available());

        let compressed = zstd::encode_all(&b"{\"a\":1}"[..], 3).unwrap();
        let decoded = registry.decode(ContentEncoding::Zstd, &compressed).unwrap();
        assert_eq!(decoded.as_ref(), b"{\"a\":1}");
    }
}
