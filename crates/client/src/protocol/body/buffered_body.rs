use std::io::{self, Cursor, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use crate::protocol::HeaderFields;

/// A response body held fully in memory.
///
/// Unlike the streaming body it knows its length and supports seeking, but it is
/// still read-only.
#[derive(Debug, Clone)]
pub struct BufferedBody {
    cursor: Cursor<Bytes>,
    trailers: Option<HeaderFields>,
}

impl BufferedBody {
    pub fn new(bytes: Bytes, trailers: Option<HeaderFields>) -> Self {
        Self { cursor: Cursor::new(bytes), trailers }
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// The whole body, regardless of the read position.
    pub fn bytes(&self) -> &Bytes {
        self.cursor.get_ref()
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn trailers(&self) -> Option<&HeaderFields> {
        self.trailers.as_ref()
    }

    pub fn into_bytes(self) -> Bytes {
        self.cursor.into_inner()
    }
}

impl AsyncRead for BufferedBody {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().cursor).poll_read(cx, buf)
    }
}

impl AsyncSeek for BufferedBody {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.get_mut().cursor).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.get_mut().cursor).poll_complete(cx)
    }
}
