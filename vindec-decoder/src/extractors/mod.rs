//! Decode source adapters
//!
//! Each adapter queries one upstream VIN decoder and maps its payload into
//! canonical fields through the shared tables in [`field_map`].
//!
//! - [`nhtsa_client`]: NHTSA vPIC (primary, no key)
//! - [`vindecoder_client`]: VinDecoder.eu (secondary, optional key)

pub mod field_map;
pub mod nhtsa_client;
pub mod vindecoder_client;

pub use nhtsa_client::NhtsaClient;
pub use vindecoder_client::VinDecoderClient;

use crate::types::SourceError;
use reqwest::{header, Client};

/// User-Agent sent to every upstream
pub const USER_AGENT: &str = concat!("vindec/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client
///
/// No client-wide timeout: each request carries its own deadline.
pub(crate) fn build_http_client() -> Result<Client, SourceError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static(USER_AGENT),
    );

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| SourceError::NetworkFailure(format!("HTTP client setup failed: {}", e)))
}
