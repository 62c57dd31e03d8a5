//! HTTP codec module for encoding requests and decoding responses
//!
//! This module provides streaming HTTP/1.x message processing for the client side
//! of a connection. It uses a state machine pattern to handle both heads and
//! payload data.
//!
//! # Architecture
//!
//! - Request handling:
//!   - [`RequestEncoder`]: Encodes outgoing HTTP requests
//!   - Head encoding via the [`header`] module
//!   - Payload encoding via the [`body`] module
//!
//! - Response handling:
//!   - [`ResponseDecoder`]: Decodes incoming HTTP responses
//!   - Head parsing via the [`header`] module
//!   - Payload decoding via the [`body`] module
//!
//! # Example
//!
//! ```
//! use micro_http_client::codec::{RequestEncoder, ResponseDecoder};
//! use micro_http_client::protocol::{ClientConfig, Message, PayloadSize, Request};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::{Bytes, BytesMut};
//!
//! // Encode an outgoing request
//! let (head, ()) = Request::builder().uri("http://example.com/").body(()).unwrap().into_parts();
//! let mut encoder = RequestEncoder::default();
//! let mut request_buffer = BytesMut::new();
//! encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::Empty)), &mut request_buffer).unwrap();
//!
//! // Decode the incoming response
//! let mut decoder = ResponseDecoder::new(&ClientConfig::default());
//! let mut response_buffer = BytesMut::from(&b"HTTP/1.1 204 No Content\r\n\r\n"[..]);
//! let response = decoder.decode(&mut response_buffer);
//! assert!(response.unwrap().unwrap().is_header());
//! ```

pub mod body;
pub mod header;
mod request_encoder;
mod response_decoder;

pub use header::{HeaderParser, parse_payload};
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
