//! Byte-stream collaborator used by workers to fetch payloads.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::DownloadError;

/// An open payload stream.
pub struct ByteStream {
    /// Payload length announced up front, when the server sent one.
    pub total_length: Option<u64>,
    /// Body chunks in arrival order.
    pub chunks: BoxStream<'static, Result<Vec<u8>, DownloadError>>,
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("total_length", &self.total_length)
            .finish_non_exhaustive()
    }
}

/// Opens byte streams for resolved source URLs.
///
/// Streaming is not rate limited; only link resolution passes the shared gate.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Opens `url` and reports its total length when known.
    async fn open(&self, url: &str) -> Result<ByteStream, DownloadError>;
}
