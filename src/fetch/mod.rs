//! Upstream fetch pipeline
//!
//! One attempt is: GET the upstream under a hard deadline, collect the whole
//! body, decompress it per its declared encoding, parse it as JSON, and turn
//! the result into a [`FetchOutcome`]. Every failure is classified
//! ([`FailureKind`]) and recovered here; nothing propagates past the
//! [`Fetcher`].

mod executor;
pub mod http;
mod outcome;

pub use executor::{Fetcher, decode_response};
pub use http::{HttpTransport, RawResponse, Transport, TransportError};
pub use outcome::{FailureKind, FetchError, FetchOutcome};
