//! HTTP connection handling module
//!
//! This module drives request/response exchanges over a byte stream.
//!
//! # Components
//!
//! - [`HttpConnection`]: runs one exchange at a time over a read half and a write half:
//!   - Writes the request head and streams the request body
//!   - Implements the expect-continue handshake
//!   - Skips interim responses
//!   - Hands the response body the connection so it streams on demand
//!
//! - [`Connect`]: how a [`Client`](crate::client::Client) obtains a stream for a request,
//!   with [`TcpConnector`] as the plain TCP implementation
//!
//! Every wait on the network can be abandoned through a
//! [`CancellationToken`](tokio_util::sync::CancellationToken).

mod connect;
mod http_connection;

pub use connect::{Connect, LocalConnect, TcpConnector};
pub use http_connection::HttpConnection;
