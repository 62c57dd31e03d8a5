//! Core HTTP protocol abstractions for the client.
//!
//! This module provides the building blocks used by the codecs and connections:
//! message types, request and response heads, configuration and errors.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): Core message types and payload processing
//!   - [`Message`]: Represents either a head or a payload chunk
//!   - [`PayloadItem`]: Handles individual payload chunks and EOF
//!   - [`PayloadSize`]: How a body is delimited on the wire
//!
//! - **Header Fields** ([`header`]): ordered, duplicate preserving fields
//!   - [`HeaderFields`] / [`HeaderField`]
//!
//! - **Requests** ([`request`]): [`Request`], [`RequestHead`] and [`RequestBuilder`]
//!
//! - **Responses** ([`response`]): [`Response`] and [`ResponseHead`], keeping the
//!   literal status code and reason phrase
//!
//! - **Body Streaming** ([`body`]): [`body::ResponseBody`] and [`body::BufferedBody`]
//!
//! - **Configuration** ([`config`]): [`ClientConfig`] and the derived [`HeaderPolicy`]
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error type, classified by [`ErrorKind`]
//!   - [`ParseError`]: Response parsing errors
//!   - [`SendError`]: Request sending errors

pub mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

pub mod header;
pub use header::HeaderField;
pub use header::HeaderFields;

pub mod request;
pub use request::Request;
pub use request::RequestBuilder;
pub use request::RequestHead;

pub mod response;
pub use response::Response;
pub use response::ResponseHead;

pub mod config;
pub use config::ClientConfig;
pub use config::HeaderPolicy;

pub mod error;
pub use error::BoxError;
pub use error::ErrorKind;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
