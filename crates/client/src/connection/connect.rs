use std::io;

use http::Uri;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Opens byte streams to the origin of a request.
///
/// The client calls this once per exchange; pooling, proxies and TLS belong to
/// implementations of this trait.
#[trait_variant::make(Connect: Send)]
pub trait LocalConnect {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self, uri: &Uri) -> io::Result<Self::Stream>;
}

/// Plain TCP connector for `http` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector {
    nodelay: bool,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self { nodelay: true }
    }

    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, uri: &Uri) -> io::Result<TcpStream> {
        let (host, port) = tcp_address(uri)?;
        debug!(host, port, "connecting");
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(self.nodelay)?;
        Ok(stream)
    }
}

fn tcp_address(uri: &Uri) -> io::Result<(&str, u16)> {
    match uri.scheme_str() {
        Some(scheme) if scheme.eq_ignore_ascii_case("http") => {}
        Some(scheme) if scheme.eq_ignore_ascii_case("https") => {
            return Err(io::Error::new(io::ErrorKind::Unsupported, "https needs a TLS capable connector"));
        }
        _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("can't connect to {uri}"))),
    }

    let host = uri.host().ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("{uri} has no host")))?;
    let host = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
    Ok((host, uri.port_u16().unwrap_or(80)))
}
