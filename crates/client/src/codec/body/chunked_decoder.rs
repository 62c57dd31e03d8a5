//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module decodes response bodies that use chunked transfer coding as specified
//! in [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).
//!
//! Each chunk starts with its size in hexadecimal, optionally followed by whitespace
//! and `;extensions`, then CRLF, the chunk data and another CRLF. A zero-sized chunk
//! ends the body and may be followed by trailer fields, which are kept and parsed
//! with the same rules as the response head.

use std::task::Poll;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::HeaderParser;
use crate::protocol::{HeaderFields, HeaderPolicy, ParseError, PayloadItem};
use ChunkedState::*;

/// Largest chunk size accepted, `2^63 - 1`.
pub const MAX_CHUNK_SIZE: u64 = i64::MAX as u64;

/// Upper bound for chunk extension and whitespace bytes on a single size line.
pub const MAX_CHUNK_EXTENSIONS_BYTES: usize = 16 * 1024;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// Chunk data is handed out as soon as it arrives, one slice per call, so the
/// caller's read pace decides how much is buffered.
#[derive(Debug, Clone)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    /// Hex digits seen on the current size line
    size_digits: usize,
    /// Extension and whitespace bytes seen on the current size line
    extensions_len: usize,
    trailer_buf: BytesMut,
    trailers: Option<HeaderFields>,
    parser: HeaderParser,
    max_trailer_bytes: usize,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new(HeaderPolicy::default())
    }
}

impl ChunkedDecoder {
    /// Creates a new ChunkedDecoder instance.
    ///
    /// The decoder starts in the Size state, ready to read the size of the first chunk.
    /// Trailer fields are bounded and validated according to `policy`.
    pub fn new(policy: HeaderPolicy) -> Self {
        Self {
            state: Size,
            remaining_size: 0,
            size_digits: 0,
            extensions_len: 0,
            trailer_buf: BytesMut::new(),
            trailers: None,
            parser: HeaderParser::new(policy),
            max_trailer_bytes: policy.max_header_bytes,
        }
    }

    /// Takes the trailer fields once the body has been fully decoded.
    pub fn take_trailers(&mut self) -> Option<HeaderFields> {
        self.trailers.take()
    }

    /// The error to report when the connection closes before the body ends.
    pub fn eof_error(&self) -> ParseError {
        match self.state {
            BodyCr | BodyLf => ParseError::malformed_chunk("connection closed before the CRLF following chunk data"),
            _ => ParseError::incomplete_response("connection closed inside chunked body"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Read a trailer field line
    Trailer,
    /// Read LF after a trailer field
    TrailerLf,
    /// Start of a trailer line, CR here ends the body
    EndCr,
    /// Read final LF
    EndLf,
    /// Final state after reading last chunk
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is available
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk and trailers are processed
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError::MalformedChunk)` if the chunked encoding is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                // need more data
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.step(src, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedDecoder {
    fn step(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        match self.state {
            Size => self.read_size(src),
            SizeLws => self.read_size_lws(src),
            Extension => self.read_extension(src),
            SizeLf => self.read_size_lf(src),
            Body => self.read_body(src, buf),
            BodyCr => Self::read_body_cr(src),
            BodyLf => self.read_body_lf(src),
            Trailer => self.read_trailer(src),
            TrailerLf => self.read_trailer_lf(src),
            EndCr => self.read_end_cr(src),
            EndLf => self.read_end_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Reads the chunk size digit by digit.
    ///
    /// # State Transitions
    /// - On hex digit: stay in Size
    /// - On SP/HTAB: SizeLws
    /// - On `;`: Extension
    /// - On CR: SizeLf
    ///
    /// The last three require at least one digit. Anything else is an error.
    fn read_size(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) if val <= MAX_CHUNK_SIZE => val,
                    _ => return Poll::Ready(Err(ParseError::malformed_chunk("invalid overflow chunked length"))),
                }
            };
        }

        let radix = 16;
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' | b';' | b'\r' if self.size_digits == 0 => {
                return Poll::Ready(Err(ParseError::malformed_chunk("chunk size line has no hex digits")));
            }
            b'\t' | b' ' => return self.count_extension_byte(SizeLws),
            b';' => return self.count_extension_byte(Extension),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            _ => return Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk size line: Invalid Size"))),
        };

        self.size_digits += 1;
        self.remaining_size = or_overflow!(self.remaining_size.checked_mul(radix));
        self.remaining_size = or_overflow!(self.remaining_size.checked_add(u64::from(digit)));

        Poll::Ready(Ok(Size))
    }

    /// Processes linear whitespace after the chunk size: more SP/HTAB, `;` or CR.
    fn read_size_lws(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => self.count_extension_byte(SizeLws),
            b';' => self.count_extension_byte(Extension),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk size linear white space"))),
        }
    }

    /// Skips chunk extensions up to the CR, rejecting a bare LF.
    fn read_extension(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk extension contains newline"))),
            _ => self.count_extension_byte(Extension),
        }
    }

    fn count_extension_byte(&mut self, next: ChunkedState) -> Poll<Result<ChunkedState, ParseError>> {
        self.extensions_len += 1;
        if self.extensions_len > MAX_CHUNK_EXTENSIONS_BYTES {
            return Poll::Ready(Err(ParseError::malformed_chunk("chunk extensions exceed the limit")));
        }
        Poll::Ready(Ok(next))
    }

    /// Validates the LF ending the size line; a zero size starts the trailer section.
    fn read_size_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' if self.remaining_size == 0 => Poll::Ready(Ok(EndCr)),
            b'\n' => Poll::Ready(Ok(Body)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk size LF"))),
        }
    }

    /// Hands out up to `remaining_size` bytes of chunk data.
    fn read_body(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        if src.is_empty() {
            return Poll::Ready(Ok(Body));
        }

        if self.remaining_size == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = usize::try_from(self.remaining_size).unwrap_or(usize::MAX);
        let read_size = std::cmp::min(remaining, src.len());

        self.remaining_size -= read_size as u64;
        *buf = Some(src.split_to(read_size).freeze());

        if self.remaining_size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => Poll::Ready(Err(ParseError::malformed_chunk("chunk data is not followed by CRLF"))),
        }
    }

    fn read_body_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                self.size_digits = 0;
                self.extensions_len = 0;
                Poll::Ready(Ok(Size))
            }
            _ => Poll::Ready(Err(ParseError::malformed_chunk("chunk data is not followed by CRLF"))),
        }
    }

    /// Collects the bytes of a trailer field line.
    fn read_trailer(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => {
                self.push_trailer_byte(b'\r')?;
                Poll::Ready(Ok(TrailerLf))
            }
            b => {
                self.push_trailer_byte(b)?;
                Poll::Ready(Ok(Trailer))
            }
        }
    }

    fn read_trailer_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                self.push_trailer_byte(b'\n')?;
                Poll::Ready(Ok(EndCr))
            }
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid trailer end LF"))),
        }
    }

    /// At the start of a trailer line: CR means the trailer section is over.
    fn read_end_cr(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            b => {
                self.push_trailer_byte(b)?;
                Poll::Ready(Ok(Trailer))
            }
        }
    }

    fn read_end_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                if !self.trailer_buf.is_empty() {
                    let trailers = self.parser.parse(&self.trailer_buf)?;
                    trace!(count = trailers.len(), "read chunked trailers");
                    self.trailers = Some(trailers);
                    self.trailer_buf = BytesMut::new();
                }
                Poll::Ready(Ok(End))
            }
            _ => Poll::Ready(Err(ParseError::malformed_chunk("invalid chunk end LF"))),
        }
    }

    fn push_trailer_byte(&mut self, b: u8) -> Result<(), ParseError> {
        if self.trailer_buf.len() >= self.max_trailer_bytes {
            return Err(ParseError::too_large_header(self.trailer_buf.len() + 1, self.max_trailer_bytes));
        }
        self.trailer_buf.extend_from_slice(&[b]);
        Ok(())
    }
}
