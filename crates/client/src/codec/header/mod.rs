//! HTTP head processing module
//!
//! This module handles the head section of both directions of an exchange.
//!
//! # Components
//!
//! - [`HeaderParser`]: Parses header field blocks into ordered fields
//!   - Unfolds obs-fold continuation lines
//!   - Accepts CRLF and bare LF line endings
//!   - Enforces the header value byte rules
//!
//! - [`HeaderDecoder`]: Decodes a response head (status line + fields)
//!   - Bounds the head size
//!   - Keeps the literal status code and reason phrase
//!
//! - [`HeaderEncoder`]: Encodes a request head
//!   - Writes fields in caller order
//!   - Derives `Host` and the framing fields

mod header_decoder;
mod header_encoder;
mod header_parser;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::parse_payload;
pub use header_encoder::HeaderEncoder;
pub use header_parser::HeaderParser;
pub(crate) use header_parser::check_field_value;
