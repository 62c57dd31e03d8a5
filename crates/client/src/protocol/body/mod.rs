//! Response body handling.
//!
//! - [`ResponseBody`]: streams the body straight from the connection. It implements
//!   `tokio::io::AsyncRead` and `http_body::Body`, exposes chunked trailers once
//!   the body is done, and hands the connection back for reuse or protocol
//!   switching.
//! - [`BufferedBody`]: a fully read body with a known length and read-only seeking.
//!
//! Bodies are never read ahead: bytes are pulled from the connection only when the
//! caller asks for them.

mod buffered_body;
mod response_body;

pub use buffered_body::BufferedBody;
pub use response_body::ResponseBody;
