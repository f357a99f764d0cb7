//! gzip + base64 content encoding used for class and project files on the wire.

use async_compression::tokio::bufread::{GzipDecoder, GzipEncoder};
use base64::engine::general_purpose;
use base64::Engine;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::utils::{Result, SyncError};

/// Compress `content` with gzip, then base64-encode the result.
pub async fn encode_content(content: &[u8]) -> Result<String> {
    let mut encoder = GzipEncoder::new(content);
    let mut compressed = Vec::with_capacity(content.len() / 2 + 32);
    encoder
        .read_to_end(&mut compressed)
        .await
        .map_err(|e| SyncError::Compression(format!("gzip encode failed: {e}")))?;
    Ok(general_purpose::STANDARD.encode(compressed))
}

/// Reverse of [`encode_content`].
pub async fn decode_content(encoded: &str) -> Result<Bytes> {
    let compressed = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SyncError::Compression(format!("invalid base64 payload: {e}")))?;

    let mut decoder = GzipDecoder::new(compressed.as_slice());
    let mut content = Vec::new();
    decoder
        .read_to_end(&mut content)
        .await
        .map_err(|e| SyncError::Compression(format!("gzip decode failed: {e}")))?;
    Ok(Bytes::from(content))
}
