//! Helpers shared by the unit tests: a scripted peer on the other side of an
//! in-memory stream, plus a few request body sources.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::io;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::stream;
use http::Uri;
use http_body::{Body, Frame, SizeHint};
use http_body_util::StreamBody;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::time::{Instant, timeout_at};

use crate::connection::{Connect, HttpConnection};
use crate::protocol::ClientConfig;

const DUPLEX_BUFFER: usize = 64 * 1024;

pub type TestConnection = HttpConnection<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// Routes `tracing` output through the test harness; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).with_test_writer().try_init();
}

pub fn connection_pair(config: ClientConfig) -> (TestConnection, TestServer) {
    init_tracing();
    let (client, server) = tokio::io::duplex(DUPLEX_BUFFER);
    let (reader, writer) = tokio::io::split(client);
    (HttpConnection::with_config(reader, writer, config), TestServer::new(server))
}

/// A request head as the peer received it.
#[derive(Debug)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub version: u8,
    /// names are lowercased, values kept as raw bytes
    pub headers: Vec<(String, Vec<u8>)>,
}

impl ReceivedRequest {
    pub fn raw_header(&self, name: &str) -> Option<&[u8]> {
        self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_slice())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw_header(name).and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// The server end of an in-memory connection, driven step by step by a test.
#[derive(Debug)]
pub struct TestServer {
    stream: DuplexStream,
    leftover: Vec<u8>,
}

impl TestServer {
    fn new(stream: DuplexStream) -> Self {
        Self { stream, leftover: Vec::new() }
    }

    /// Reads one request head. Bytes after the head stay buffered for the body reads.
    pub async fn read_request(&mut self) -> ReceivedRequest {
        loop {
            let mut headers = [httparse::EMPTY_HEADER; 64];
            let mut request = httparse::Request::new(&mut headers);
            if let httparse::Status::Complete(len) = request.parse(&self.leftover).expect("client sent a malformed request") {
                let received = ReceivedRequest {
                    method: request.method.unwrap_or_default().to_string(),
                    path: request.path.unwrap_or_default().to_string(),
                    version: request.version.unwrap_or_default(),
                    headers: request.headers.iter().map(|h| (h.name.to_ascii_lowercase(), h.value.to_vec())).collect(),
                };
                self.leftover.drain(..len);
                return received;
            }

            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await.expect("read request");
            assert!(n > 0, "connection closed before a full request head");
            self.leftover.extend_from_slice(&buf[..n]);
        }
    }

    pub async fn read_exact(&mut self, len: usize) -> Vec<u8> {
        while self.leftover.len() < len {
            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await.expect("read body");
            assert!(n > 0, "connection closed before {len} bytes arrived");
            self.leftover.extend_from_slice(&buf[..n]);
        }
        self.leftover.drain(..len).collect()
    }

    /// Collects whatever arrives within `duration`, stopping early at end of stream.
    pub async fn try_read_for(&mut self, duration: Duration) -> Vec<u8> {
        let deadline = Instant::now() + duration;
        let mut received = std::mem::take(&mut self.leftover);
        let mut buf = [0u8; 4096];
        while let Ok(Ok(n)) = timeout_at(deadline, self.stream.read(&mut buf)).await {
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        received
    }

    pub async fn write(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write response");
        self.stream.flush().await.expect("flush response");
    }

    /// Like [`write`](Self::write), but reports a gone client instead of panicking.
    pub async fn try_write(&mut self, bytes: &[u8]) -> bool {
        self.stream.write_all(bytes).await.is_ok()
    }

    /// Closes the server's write side; the client then sees end of stream.
    pub async fn shutdown(&mut self) {
        self.stream.shutdown().await.expect("shutdown");
    }

    /// Whether the client dropped its end of the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1024];
        match tokio::time::timeout(Duration::from_secs(1), self.stream.read(&mut buf)).await {
            Ok(Ok(0) | Err(_)) => true,
            Ok(Ok(n)) => {
                self.leftover.extend_from_slice(&buf[..n]);
                false
            }
            Err(_) => false,
        }
    }
}

/// Hands out pre-made in-memory connections, one per `connect` call.
#[derive(Debug)]
pub struct MockConnector {
    streams: Mutex<VecDeque<DuplexStream>>,
}

impl MockConnector {
    pub fn new(connections: usize) -> (Self, Vec<TestServer>) {
        init_tracing();
        let mut streams = VecDeque::with_capacity(connections);
        let mut servers = Vec::with_capacity(connections);
        for _ in 0..connections {
            let (client, server) = tokio::io::duplex(DUPLEX_BUFFER);
            streams.push_back(client);
            servers.push(TestServer::new(server));
        }
        (Self { streams: Mutex::new(streams) }, servers)
    }
}

impl Connect for MockConnector {
    type Stream = DuplexStream;

    async fn connect(&self, uri: &Uri) -> io::Result<DuplexStream> {
        let stream = self.streams.lock().expect("connector lock").pop_front();
        stream.ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, format!("no connection left for {uri}")))
    }
}

pub type ChunkedBody = StreamBody<stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, Infallible>>>>;

/// A body of unknown length, so the connection picks chunked framing for it.
pub fn chunked_body(chunks: &[&'static str]) -> ChunkedBody {
    let frames: Vec<_> = chunks.iter().map(|chunk| Ok(Frame::data(Bytes::from_static(chunk.as_bytes())))).collect();
    StreamBody::new(stream::iter(frames))
}

#[derive(Debug, thiserror::Error)]
#[error("{}", FailingBody::MESSAGE)]
pub struct BodySourceError;

/// A request body source that fails, either right away or after one chunk.
#[derive(Debug)]
pub struct FailingBody {
    immediately: bool,
    sent_chunk: bool,
}

impl FailingBody {
    pub const MESSAGE: &'static str = "body source broke down";

    pub fn new(immediately: bool) -> Self {
        Self { immediately, sent_chunk: false }
    }
}

impl Body for FailingBody {
    type Data = Bytes;
    type Error = BodySourceError;

    fn poll_frame(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if self.immediately || self.sent_chunk {
            return Poll::Ready(Some(Err(BodySourceError)));
        }
        self.sent_chunk = true;
        Poll::Ready(Some(Ok(Frame::data(Bytes::from_static(b"first")))))
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}
