use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadSize, RequestHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes a request head followed by its body items.
///
/// The head fixes the framing; body items are then framed with the matching
/// [`PayloadEncoder`] until the body is finished.
#[derive(Debug)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new(allow_high_bytes: bool) -> Self {
        Self { header_encoder: HeaderEncoder::new(allow_high_bytes), payload_encoder: None }
    }

    /// Returns true when a head was written and its body is not finished yet.
    pub fn in_body(&self) -> bool {
        self.payload_encoder.is_some()
    }

    /// Forgets an unfinished body, e.g. when the server answered before it was sent.
    pub fn abandon_body(&mut self) {
        self.payload_encoder.take();
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<D: Buf> Encoder<Message<(RequestHead, PayloadSize), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(RequestHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.header_encoder.encode((head, payload_size), dst)?;

                let payload_encoder = PayloadEncoder::new(payload_size);
                if !payload_encoder.is_empty() {
                    self.payload_encoder = Some(payload_encoder);
                }
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    if payload_item.is_eof() {
                        return Ok(());
                    }
                    error!("expect request head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let is_eof = payload_item.is_eof();
                let result = payload_encoder.encode(payload_item, dst);

                if is_eof || result.is_err() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PayloadItem, Request};
    use bytes::Bytes;

    fn head(method: &str) -> RequestHead {
        Request::builder().method(method).uri("http://example.com/upload").body(()).unwrap().into_parts().0
    }

    #[test]
    fn chunked_request() {
        let mut encoder = RequestEncoder::default();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head("POST"), PayloadSize::Chunked)), &mut dst).unwrap();
        assert!(encoder.in_body());
        encoder.encode(Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut dst).unwrap();
        encoder.encode(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof), &mut dst).unwrap();
        assert!(!encoder.in_body());

        let expected = "POST /upload HTTP/1.1\r\nhost: example.com\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
        assert_eq!(&dst[..], expected.as_bytes());
    }

    #[test]
    fn empty_request() {
        let mut encoder = RequestEncoder::default();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head("GET"), PayloadSize::Empty)), &mut dst).unwrap();
        assert!(!encoder.in_body());
        encoder.encode(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof), &mut dst).unwrap();
        assert_eq!(&dst[..], b"GET /upload HTTP/1.1\r\nhost: example.com\r\n\r\n");
    }

    #[test]
    fn payload_before_head() {
        let mut encoder = RequestEncoder::default();
        let mut dst = BytesMut::new();
        let message = Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(Bytes::from_static(b"x")));
        assert!(encoder.encode(message, &mut dst).is_err());
    }

    #[test]
    fn head_during_body() {
        let mut encoder = RequestEncoder::default();
        let mut dst = BytesMut::new();
        encoder.encode(Message::<_, Bytes>::Header((head("PUT"), PayloadSize::Length(3))), &mut dst).unwrap();
        assert!(encoder.encode(Message::<_, Bytes>::Header((head("PUT"), PayloadSize::Length(3))), &mut dst).is_err());

        encoder.abandon_body();
        assert!(!encoder.in_body());
    }
}
