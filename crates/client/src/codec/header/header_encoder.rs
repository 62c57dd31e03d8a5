//! HTTP request head encoder
//!
//! Serializes a [`RequestHead`] and its [`PayloadSize`] into the request line and
//! header block. Caller supplied fields are written in order with duplicates kept;
//! the framing fields (`Content-Length` / `Transfer-Encoding`) always come from the
//! payload size so they cannot disagree with the bytes that follow.
//!
//! # Versions
//!
//! - HTTP/1.0 and HTTP/1.1 are written as-is
//! - HTTP/2 and HTTP/3 requests are written as HTTP/1.1, without any upgrade header
//! - HTTP/0.9 is rejected

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::header::{CONTENT_LENGTH, EXPECT, HOST, TRANSFER_ENCODING};
use http::{Method, Version};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::header::check_field_value;
use crate::protocol::{PayloadSize, RequestHead, SendError};

/// Initial buffer size reserved for the request head
const INIT_HEADER_SIZE: usize = 1024;

/// Encoder for HTTP request heads implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder {
    allow_high_bytes: bool,
}

impl HeaderEncoder {
    pub fn new(allow_high_bytes: bool) -> Self {
        Self { allow_high_bytes }
    }

    /// Validates every field value before a single byte is written.
    fn check_headers(&self, head: &RequestHead) -> Result<(), SendError> {
        for field in head.headers() {
            check_field_value(field.value().as_bytes(), self.allow_high_bytes)
                .map_err(|reason| SendError::invalid_header(format!("value of {} {reason}", field.name())))?;
        }
        Ok(())
    }
}

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes a request head into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the version is HTTP/0.9
    /// - the request has no target uri
    /// - a header value breaks the configured byte rules
    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, payload_size) = item;

        let version = match head.version() {
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 | Version::HTTP_2 | Version::HTTP_3 => "HTTP/1.1",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(SendError::unsupported_version(v));
            }
        };

        let Some(uri) = head.uri() else {
            return Err(SendError::Io { source: io::Error::new(io::ErrorKind::InvalidInput, "request has no target uri") });
        };

        self.check_headers(&head)?;

        dst.reserve(INIT_HEADER_SIZE);

        let target = if *head.method() == Method::CONNECT {
            uri.authority().map_or("", |authority| authority.as_str())
        } else {
            uri.path_and_query().map_or("/", |path| path.as_str())
        };
        let target = if target.is_empty() { "/" } else { target };
        write!(FastWrite(dst), "{} {} {}\r\n", head.method(), target, version)?;

        if let Some(host) = head.host_value() {
            write_field(dst, HOST.as_str().as_bytes(), host.as_bytes());
        }

        for field in head.headers() {
            if *field.name() == CONTENT_LENGTH || *field.name() == TRANSFER_ENCODING {
                continue;
            }
            write_field(dst, field.name().as_str().as_bytes(), field.value().as_bytes());
        }

        match payload_size {
            PayloadSize::Length(n) => write!(FastWrite(dst), "content-length: {n}\r\n")?,
            PayloadSize::Chunked => write_field(dst, TRANSFER_ENCODING.as_str().as_bytes(), b"chunked"),
            PayloadSize::UntilClose | PayloadSize::Empty => {}
        }

        if head.expect_continue() && !head.headers().contains(EXPECT) {
            write_field(dst, EXPECT.as_str().as_bytes(), b"100-continue");
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

fn write_field(dst: &mut BytesMut, name: &[u8], value: &[u8]) {
    dst.put_slice(name);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// Writer over BytesMut, so `write!` can format straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
