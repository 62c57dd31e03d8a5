//! Decoder for bodies delimited by the connection closing.
//!
//! Used when a response carries neither a usable `Content-Length` nor chunked
//! framing. Every byte that arrives belongs to the body, and the end of the stream
//! is the end of the body.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseDecoder {
    eof: bool,
}

impl CloseDecoder {
    pub fn new() -> Self {
        Self { eof: false }
    }
}

impl Decoder for CloseDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.eof {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            self.eof = true;
        }
        self.decode(src)
    }
}
