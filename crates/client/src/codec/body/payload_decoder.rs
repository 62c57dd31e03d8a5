//! Decoder implementation for HTTP response payloads.
//!
//! This module provides a unified decoder for handling different types of response bodies:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Payloads delimited by the connection closing
//! - Messages with no body
//!
//! The strategy is picked from the [`PayloadSize`] computed for the response head.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::close_decoder::CloseDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{HeaderFields, HeaderPolicy, ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for handling HTTP response payloads.
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Everything until the connection closes
    UntilClose(CloseDecoder),

    /// Handle messages with no body
    NoBody,
}

impl PayloadDecoder {
    /// Creates the decoder matching `payload_size`; trailers follow `policy`.
    pub fn new(payload_size: PayloadSize, policy: HeaderPolicy) -> Self {
        match payload_size {
            PayloadSize::Length(length) => Self::fix_length(length),
            PayloadSize::Chunked => Self::chunked(policy),
            PayloadSize::UntilClose => Self { kind: Kind::UntilClose(CloseDecoder::new()) },
            PayloadSize::Empty => Self::empty(),
        }
    }

    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked(policy: HeaderPolicy) -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new(policy)) }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Returns whether this decoder handles chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// Returns whether this decoder handles messages with no body.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    /// Returns whether this decoder handles fixed-length payloads.
    pub fn is_fix_length(&self) -> bool {
        matches!(self.kind, Kind::Length(_))
    }

    /// Returns whether this decoder reads until the connection closes.
    pub fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose(_))
    }

    /// Takes the trailer fields of a finished chunked body.
    pub fn take_trailers(&mut self) -> Option<HeaderFields> {
        match &mut self.kind {
            Kind::Chunked(chunked_decoder) => chunked_decoder.take_trailers(),
            _ => None,
        }
    }
}

/// Delegates to the appropriate decoder based on the payload type.
impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::UntilClose(close_decoder) => close_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode_eof(src),
            Kind::Chunked(chunked_decoder) => match chunked_decoder.decode(src)? {
                Some(item) => Ok(Some(item)),
                None => Err(chunked_decoder.eof_error()),
            },
            Kind::UntilClose(close_decoder) => close_decoder.decode_eof(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}
