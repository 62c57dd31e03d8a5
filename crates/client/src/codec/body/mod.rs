//! HTTP body handling module for request and response payloads
//!
//! This module encodes request bodies and decodes response bodies using the
//! framing chosen for each message.
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: Handles chunked transfer encoded payloads, including trailers
//! - `LengthDecoder`: Processes fixed-length payloads
//! - `CloseDecoder`: Reads until the connection closes
//! - [`PayloadDecoder`]: Main decoder that coordinates different decoding strategies
//!
//! ## Encoders
//! - `ChunkedEncoder`: Implements chunked transfer encoding
//! - `LengthEncoder`: Writes exactly the declared number of bytes
//! - [`PayloadEncoder`]: Main encoder that manages different encoding strategies
//!
//! All decoders implement `decode_eof`, so a connection closing at the wrong moment
//! surfaces as a typed error instead of a silently short body.

mod chunked_decoder;
mod chunked_encoder;
mod close_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::{ChunkedDecoder, MAX_CHUNK_EXTENSIONS_BYTES, MAX_CHUNK_SIZE};
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
