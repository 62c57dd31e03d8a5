//! HTTP response decoder module
//!
//! This module decodes HTTP responses using a streaming approach. It handles both
//! head parsing and payload decoding through a state machine pattern.
//!
//! # Components
//!
//! - [`ResponseDecoder`]: Main decoder that coordinates head and payload parsing
//! - Head parsing: Uses [`HeaderDecoder`] for the status line and fields
//! - Payload handling: Uses [`PayloadDecoder`] for the body, if any
//!
//! # Example
//!
//! ```
//! use micro_http_client::codec::ResponseDecoder;
//! use micro_http_client::protocol::{ClientConfig, Message};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = ResponseDecoder::new(&ClientConfig::default());
//! let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi"[..]);
//!
//! let Some(Message::Header((head, _))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
//! assert_eq!(head.status(), 200);
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::{HeaderDecoder, parse_payload};
use crate::protocol::{ClientConfig, HeaderFields, HeaderPolicy, Message, ParseError, PayloadItem, PayloadSize, ResponseHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

/// A decoder for HTTP responses that handles both heads and payload
///
/// The decoder operates in two phases:
/// 1. Head parsing: Decodes the response head using [`HeaderDecoder`]
/// 2. Payload parsing: Decodes the response body using [`PayloadDecoder`]
///
/// # State Machine
///
/// The decoder maintains its state through the `payload_decoder` field:
/// - `None`: Currently parsing a head
/// - `Some(PayloadDecoder)`: Currently parsing payload
///
/// Interim (1xx other than 101) heads are emitted without entering the payload
/// phase, so several heads may be decoded before the final one.
#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
    policy: HeaderPolicy,
    head_request: bool,
    trailers: Option<HeaderFields>,
}

impl ResponseDecoder {
    /// Creates a new `ResponseDecoder` instance
    pub fn new(config: &ClientConfig) -> Self {
        let policy = config.header_policy();
        Self {
            header_decoder: HeaderDecoder::new(policy, config.reject_out_of_range_status_codes()),
            payload_decoder: None,
            policy,
            head_request: false,
            trailers: None,
        }
    }

    /// Marks whether the response being read answers a HEAD request.
    pub fn set_head_request(&mut self, head_request: bool) {
        self.head_request = head_request;
    }

    /// Takes the trailer fields of the last chunked body, if it had any.
    pub fn take_trailers(&mut self) -> Option<HeaderFields> {
        self.trailers.take()
    }

    /// Returns true when no body is being decoded and no partial head is buffered.
    pub fn is_idle(&self) -> bool {
        self.payload_decoder.is_none() && !self.header_decoder.in_progress()
    }

    fn decode_head(&mut self, src: &mut BytesMut) -> Result<Option<Message<(ResponseHead, PayloadSize)>>, ParseError> {
        let Some(mut head) = self.header_decoder.decode(src)? else {
            return Ok(None);
        };

        if head.is_interim() {
            debug!(status = head.status(), "received interim response");
            return Ok(Some(Message::Header((head, PayloadSize::Empty))));
        }

        let payload_size = parse_payload(&mut head, self.head_request)?;
        trace!(status = head.status(), ?payload_size, "received final response head");
        self.payload_decoder = Some(PayloadDecoder::new(payload_size, self.policy));
        Ok(Some(Message::Header((head, payload_size))))
    }

    fn on_payload(&mut self, item: Option<PayloadItem>) -> Option<Message<(ResponseHead, PayloadSize)>> {
        match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
            Some(item @ PayloadItem::Eof) => {
                // the body is done, the next bytes start a new response
                if let Some(mut payload_decoder) = self.payload_decoder.take() {
                    self.trailers = payload_decoder.take_trailers();
                }
                Some(Message::Payload(item))
            }
            None => None,
        }
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    /// Attempts to decode an HTTP response from the provided buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded a response head
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded a payload chunk
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // parse payload if have payload_decoder
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.on_payload(item));
        }

        self.decode_head(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode_eof(src)?;
            return Ok(self.on_payload(item));
        }

        match self.decode_head(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::incomplete_response("connection closed inside response head")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use bytes::Bytes;
    use indoc::indoc;

    fn decode_all(decoder: &mut ResponseDecoder, input: &[u8]) -> Result<Vec<Message<(ResponseHead, PayloadSize)>>, ParseError> {
        let mut buffer = BytesMut::from(input);
        let mut messages = Vec::new();
        while let Some(message) = decoder.decode_eof(&mut buffer)? {
            messages.push(message);
        }
        Ok(messages)
    }

    fn body_of(messages: &[Message<(ResponseHead, PayloadSize)>]) -> Vec<u8> {
        messages
            .iter()
            .filter_map(|m| match m {
                Message::Payload(PayloadItem::Chunk(bytes)) => Some(bytes.to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn length_response() {
        let str = indoc! {"
            HTTP/1.1 200 OK\r
            Content-Length: 5\r
            \r
            hello"};

        let mut decoder = ResponseDecoder::default();
        let messages = decode_all(&mut decoder, str.as_bytes()).unwrap();

        let Message::Header((head, payload_size)) = &messages[0] else { panic!("expected head") };
        assert_eq!(head.status(), 200);
        assert_eq!(head.reason(), "OK");
        assert_eq!(*payload_size, PayloadSize::Length(5));
        assert_eq!(body_of(&messages), b"hello");
        assert!(matches!(messages.last(), Some(Message::Payload(PayloadItem::Eof))));
        assert!(decoder.is_idle());
    }

    #[test]
    fn chunked_response_with_trailers() {
        let str = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\nX-Trailer: t\r\n\r\n";

        let mut decoder = ResponseDecoder::default();
        let messages = decode_all(&mut decoder, str.as_bytes()).unwrap();
        assert_eq!(body_of(&messages), b"hello world");
        assert_eq!(decoder.take_trailers().unwrap().get("x-trailer").unwrap(), "t");
    }

    #[test]
    fn until_close_response() {
        let str = "HTTP/1.0 200 OK\r\n\r\nhello world";

        let mut decoder = ResponseDecoder::default();
        let messages = decode_all(&mut decoder, str.as_bytes()).unwrap();
        let Message::Header((head, payload_size)) = &messages[0] else { panic!("expected head") };
        assert_eq!(head.version(), http::Version::HTTP_10);
        assert_eq!(*payload_size, PayloadSize::UntilClose);
        assert_eq!(body_of(&messages), b"hello world");
    }

    #[test]
    fn interim_heads_come_first() {
        let str = "HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 102 Processing\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n";

        let mut decoder = ResponseDecoder::default();
        let messages = decode_all(&mut decoder, str.as_bytes()).unwrap();
        let statuses: Vec<u16> = messages
            .iter()
            .filter_map(|m| match m {
                Message::Header((head, _)) => Some(head.status()),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![100, 102, 204]);
    }

    #[test]
    fn head_request_has_no_body() {
        let mut decoder = ResponseDecoder::default();
        decoder.set_head_request(true);
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n"[..]);

        let Some(Message::Header((_, payload_size))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
        assert_eq!(payload_size, PayloadSize::Empty);
        assert!(matches!(decoder.decode(&mut buffer).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
    }

    #[test]
    fn switching_protocols_leaves_bytes() {
        let mut decoder = ResponseDecoder::default();
        let mut buffer = BytesMut::from(&b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: x\r\n\r\nraw bytes"[..]);

        let Some(Message::Header((head, payload_size))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
        assert_eq!(head.status(), 101);
        assert_eq!(payload_size, PayloadSize::Empty);
        assert!(matches!(decoder.decode(&mut buffer).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
        assert_eq!(&buffer[..], b"raw bytes");
    }

    #[test]
    fn truncated_head() {
        let mut decoder = ResponseDecoder::default();
        let error = decode_all(&mut decoder, b"HTTP/1.1 200 OK\r\nContent-").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IncompleteResponse);
    }

    #[test]
    fn short_length_body() {
        let mut decoder = ResponseDecoder::default();
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 16000\r\n\r\nabc"[..]);

        assert!(matches!(decoder.decode_eof(&mut buffer).unwrap(), Some(Message::Header(_))));
        let Some(Message::Payload(PayloadItem::Chunk(bytes))) = decoder.decode_eof(&mut buffer).unwrap() else { panic!() };
        assert_eq!(bytes, Bytes::from_static(b"abc"));
        assert_eq!(decoder.decode_eof(&mut buffer).unwrap_err().kind(), ErrorKind::IncompleteResponse);
    }

    #[test]
    fn two_responses_in_a_row() {
        let str = "HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\naHTTP/1.1 404 Not Found\r\nContent-Length: 1\r\n\r\nb";

        let mut decoder = ResponseDecoder::default();
        let messages = decode_all(&mut decoder, str.as_bytes()).unwrap();
        assert_eq!(messages.iter().filter(|m| m.is_header()).count(), 2);
        assert_eq!(body_of(&messages), b"ab");
    }
}
