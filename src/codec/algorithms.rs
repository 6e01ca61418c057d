//! Decompression routines for the content encodings the proxy understands.
//!
//! Every routine borrows its input and returns a fresh buffer.

use std::io::{self, Read};

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use tracing::debug;

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Decompress a gzip stream (multi-member streams are concatenated)
pub fn decode_gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    debug!(compressed = data.len(), decompressed = decompressed.len(), "gzip decoded");
    Ok(decompressed)
}

/// Decompress an HTTP `deflate` body.
///
/// The HTTP token means zlib-wrapped DEFLATE, but a fair number of servers
/// send the raw stream, so a body without a valid zlib header is retried as
/// raw DEFLATE.
pub fn decode_deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut decompressed) {
        Ok(_) => Ok(decompressed),
        Err(zlib_err) => {
            debug!(error = %zlib_err, "zlib header rejected, retrying as raw deflate");
            decompressed.clear();
            DeflateDecoder::new(data).read_to_end(&mut decompressed)?;
            Ok(decompressed)
        }
    }
}

/// Decompress a Brotli stream
pub fn decode_brotli(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    debug!(compressed = data.len(), decompressed = decompressed.len(), "brotli decoded");
    Ok(decompressed)
}

/// Decompress a Zstandard stream
#[cfg(feature = "zstd")]
pub fn decode_zstd(data: &[u8]) -> io::Result<Vec<u8>> {
    zstd::decode_all(data)
}

/// Check that the zstd library actually round-trips data on this build.
#[cfg(feature = "zstd")]
pub(crate) fn zstd_probe() -> io::Result<()> {
    const PROBE: &[u8] = b"{\"probe\":true}";

    let frame = zstd::encode_all(PROBE, 0)?;
    let decoded = decode_zstd(&frame)?;
    if decoded != PROBE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "zstd probe returned different bytes",
        ));
    }
    Ok(())
}
