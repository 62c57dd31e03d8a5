//! HTTP response head decoder
//!
//! This module turns raw bytes into a [`ResponseHead`]: the status line followed
//! by header fields, terminated by an empty line. Unlike request parsing on the
//! server side, response heads are read line by line so that obs-fold
//! continuations, bare LF line endings and unregistered status codes survive.
//!
//! # Limits
//!
//! - The whole head is bounded by [`HeaderPolicy::max_header_bytes`]
//! - Only HTTP/1.0 and HTTP/1.x are accepted; any later minor version is read as 1.1
//!
//! # Implementation Details
//!
//! The decoder remembers how far it already scanned for the blank line, so a head
//! arriving one byte at a time costs linear work overall. Once the terminator is
//! found, the head is split off the buffer and handed to [`HeaderParser`].

use bytes::BytesMut;
use http::Version;
use http::header::CONTENT_LENGTH;
use memchr::memchr;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::header::HeaderParser;
use crate::ensure;
use crate::protocol::{HeaderPolicy, ParseError, PayloadSize, ResponseHead};

/// Decoder for a single response head implementing the [`Decoder`] trait.
///
/// Interim (1xx) heads are decoded the same way as final ones; it is up to the
/// caller to decide what to do with them.
#[derive(Debug, Clone)]
pub struct HeaderDecoder {
    parser: HeaderParser,
    max_header_bytes: usize,
    reject_out_of_range_status: bool,
    /// Offset where the next unscanned line starts
    scanned: usize,
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new(HeaderPolicy::default(), false)
    }
}

impl HeaderDecoder {
    pub fn new(policy: HeaderPolicy, reject_out_of_range_status: bool) -> Self {
        Self { parser: HeaderParser::new(policy), max_header_bytes: policy.max_header_bytes, reject_out_of_range_status, scanned: 0 }
    }

    /// Returns true when part of a head has been buffered but not yet decoded.
    pub fn in_progress(&self) -> bool {
        self.scanned > 0
    }

    /// Finds the end of the head, returning its length including the blank line.
    fn find_head_end(&mut self, src: &[u8]) -> Option<usize> {
        while let Some(lf) = memchr(b'\n', &src[self.scanned..]) {
            let line_start = self.scanned;
            let line_end = line_start + lf;
            self.scanned = line_end + 1;

            // the status line itself is never the terminator
            if line_start == 0 {
                continue;
            }

            let line = &src[line_start..line_end];
            if line.is_empty() || line == b"\r" {
                return Some(self.scanned);
            }
        }
        None
    }
}

impl Decoder for HeaderDecoder {
    type Item = ResponseHead;
    type Error = ParseError;

    /// Attempts to decode a response head from the provided bytes buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(head))` if a complete head was parsed and split off `src`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if the head is malformed or too large
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(head_len) = self.find_head_end(src) else {
            ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
            return Ok(None);
        };

        self.scanned = 0;
        ensure!(head_len <= self.max_header_bytes, ParseError::too_large_header(head_len, self.max_header_bytes));

        let head_bytes = src.split_to(head_len).freeze();
        trace!(head_size = head_len, "parsed response head size");

        let status_end = memchr(b'\n', &head_bytes).unwrap_or(head_bytes.len());
        let status_line = &head_bytes[..status_end];
        let status_line = status_line.strip_suffix(b"\r").unwrap_or(status_line);

        let (version, status, reason) = parse_status_line(status_line)?;
        ensure!(
            !self.reject_out_of_range_status || (100..=999).contains(&status),
            ParseError::StatusCodeOutOfRange { code: status }
        );

        let headers = self.parser.parse(&head_bytes[status_end + 1..])?;

        Ok(Some(ResponseHead::new(version, status, reason, headers)))
    }
}

/// Parses `HTTP/<major>.<minor> <code>[ <reason>]`.
fn parse_status_line(line: &[u8]) -> Result<(Version, u16, String), ParseError> {
    let Some(sp) = memchr(b' ', line) else {
        return Err(ParseError::invalid_status_line(format!("no delimiter in {:?}", String::from_utf8_lossy(line))));
    };

    let version = match &line[..sp] {
        b"HTTP/1.0" => Version::HTTP_10,
        [b'H', b'T', b'T', b'P', b'/', b'1', b'.', minor] if minor.is_ascii_digit() => Version::HTTP_11,
        other => return Err(ParseError::invalid_version(other)),
    };

    let rest = &line[sp + 1..];
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    ensure!(digits > 0, ParseError::invalid_status_line("missing status code"));

    let code = rest[..digits]
        .iter()
        .try_fold(0u16, |acc, b| acc.checked_mul(10)?.checked_add(u16::from(b - b'0')))
        .ok_or_else(|| ParseError::invalid_status_line("status code overflow"))?;

    let reason = match &rest[digits..] {
        [] => String::new(),
        [b' ', reason @ ..] => String::from_utf8_lossy(reason.trim_ascii_end()).into_owned(),
        _ => return Err(ParseError::invalid_status_line("status code is not followed by a space")),
    };

    Ok((version, code, reason))
}

/// Selects the body framing of a final response, per RFC 9112 section 6.3.
///
/// `head_request` must be true when the response answers a `HEAD` request.
/// A `Content-Length` sent along with chunked transfer coding is dropped from the
/// head, since the chunked framing wins.
pub fn parse_payload(head: &mut ResponseHead, head_request: bool) -> Result<PayloadSize, ParseError> {
    if head_request || !head.may_have_body() {
        return Ok(PayloadSize::Empty);
    }

    if head.headers().contains(http::header::TRANSFER_ENCODING) {
        if head.headers().is_chunked() {
            if head.headers_mut().remove(CONTENT_LENGTH) > 0 {
                trace!("ignore content-length sent with chunked transfer-encoding");
            }
            return Ok(PayloadSize::Chunked);
        }
        return Ok(PayloadSize::UntilClose);
    }

    let mut length: Option<u64> = None;
    for value in head.headers().get_all(CONTENT_LENGTH) {
        for item in value.as_bytes().split(|b| *b == b',') {
            let item = item.trim_ascii();
            if item.is_empty() {
                continue;
            }

            let parsed = std::str::from_utf8(item)
                .ok()
                .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| ParseError::invalid_content_length(format!("value {:?} is not u64", String::from_utf8_lossy(item))))?;

            match length {
                Some(previous) if previous != parsed => {
                    return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
                }
                _ => length = Some(parsed),
            }
        }
    }

    Ok(match length {
        Some(0) => PayloadSize::Empty,
        Some(n) => PayloadSize::Length(n),
        None => PayloadSize::UntilClose,
    })
}
