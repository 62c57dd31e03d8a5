//! An asynchronous micro HTTP/1.x client protocol engine
//!
//! This crate drives request/response exchanges over any byte stream that
//! implements tokio's `AsyncRead` and `AsyncWrite`. It writes request heads and
//! bodies, parses responses off the wire, and streams response bodies on demand.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 requests, with `Content-Length` or chunked request bodies
//! - Expect-continue handshake with a configurable timeout
//! - Interim (1xx) responses skipped transparently
//! - Response bodies delimited by length, chunked encoding (with trailers) or connection close
//! - Cancellation of every network wait through a `CancellationToken`
//! - Connection reuse once a response body has been read to the end
//! - Protocol switching (`101`) with access to the raw stream
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http_body_util::Empty;
//! use micro_http_client::client::Client;
//! use micro_http_client::connection::TcpConnector;
//! use micro_http_client::protocol::Request;
//! use tokio_util::sync::CancellationToken;
//! use tracing::info;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(TcpConnector::new());
//!     let request = Request::builder().uri("http://127.0.0.1:8080/").body(Empty::<Bytes>::new())?;
//!
//!     let response = client.send(request, &CancellationToken::new()).await?;
//!     info!(status = response.status(), reason = response.reason(), "received response");
//!
//!     let body = response.into_body().into_buffered().await?;
//!     info!(len = body.len(), "received body");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`client`]: the front end that connects, sends and shuts down
//! - [`connection`]: runs one exchange at a time over a stream
//! - [`protocol`]: request, response, configuration and error types
//! - [`codec`]: the wire encoders and decoders
//!
//! # Limitations
//!
//! - HTTP/1.x only; newer request versions are written as HTTP/1.1
//! - No TLS, connection pooling or redirects; those belong to a [`connection::Connect`]
//!   implementation or to the caller

pub mod client;
pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

#[cfg(test)]
mod test_util;
