use std::cmp;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::connection::HttpConnection;
use crate::protocol::body::BufferedBody;
use crate::protocol::{HeaderFields, HttpError, PayloadItem, PayloadSize};

/// The body of a response, streamed from the connection that carried it.
///
/// A `ResponseBody` is a forward-only reader: it can be read through the inherent
/// [`read`](Self::read) methods, as a [`tokio::io::AsyncRead`], or as an
/// [`http_body::Body`] producing data frames followed by a trailers frame.
///
/// Once the body is exhausted every read returns `0`. Dropping the body before
/// that closes the connection.
#[derive(Debug)]
pub struct ResponseBody<R, W> {
    connection: Option<HttpConnection<R, W>>,
    payload_size: PayloadSize,
    /// Bytes handed out by the connection but not yet copied to a caller
    pending: Bytes,
    received: u64,
    state: BodyState,
    trailers: Option<HeaderFields>,
    trailers_delivered: bool,
    reusable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    Streaming,
    Finished,
    Canceled,
    Failed,
}

impl<R, W> ResponseBody<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(connection: HttpConnection<R, W>, payload_size: PayloadSize, reusable: bool) -> Self {
        Self {
            connection: Some(connection),
            payload_size,
            pending: Bytes::new(),
            received: 0,
            state: BodyState::Streaming,
            trailers: None,
            trailers_delivered: false,
            reusable,
        }
    }

    /// How the body is delimited on the wire.
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// Returns true once the whole body has been read.
    pub fn is_finished(&self) -> bool {
        self.state == BodyState::Finished && self.pending.is_empty()
    }

    /// Trailer fields of a chunked body, available once it has been fully read.
    pub fn trailers(&self) -> Option<&HeaderFields> {
        self.trailers.as_ref()
    }

    /// Polls the next piece of body data; `None` marks the end of the body.
    pub fn poll_data(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<Bytes>, HttpError>> {
        if !self.pending.is_empty() {
            return Poll::Ready(Ok(Some(std::mem::take(&mut self.pending))));
        }

        match self.state {
            BodyState::Streaming => {}
            BodyState::Finished => return Poll::Ready(Ok(None)),
            BodyState::Canceled => return Poll::Ready(Err(HttpError::Canceled)),
            BodyState::Failed => return Poll::Ready(Err(HttpError::invalid_request_state("response body already failed"))),
        }

        let Some(connection) = self.connection.as_mut() else {
            return Poll::Ready(Err(HttpError::invalid_request_state("response body has no connection")));
        };

        match ready!(connection.poll_payload(cx)) {
            Ok(PayloadItem::Chunk(bytes)) => {
                self.received += bytes.len() as u64;
                trace!(len = bytes.len(), "read response body bytes");
                Poll::Ready(Ok(Some(bytes)))
            }
            Ok(PayloadItem::Eof) => {
                self.state = BodyState::Finished;
                self.trailers = connection.take_trailers();
                debug!(received = self.received, "response body finished");
                Poll::Ready(Ok(None))
            }
            Err(e) => {
                debug!("response body failed, cause {}", e);
                self.state = BodyState::Failed;
                self.connection = None;
                Poll::Ready(Err(e.into()))
            }
        }
    }

    /// Reads body bytes into `buf`, returning how many were copied.
    ///
    /// Returns `0` for an empty `buf` without touching the connection, and `0`
    /// forever once the body is exhausted.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, HttpError> {
        if buf.is_empty() {
            return Ok(0);
        }

        let data = poll_fn(|cx| self.poll_data(cx)).await?;
        Ok(data.map_or(0, |bytes| self.copy_out(bytes, buf)))
    }

    /// Like [`read`](Self::read), but gives up with [`HttpError::Canceled`] when
    /// `cancel` fires. A canceled body can't be read anymore and its connection
    /// is closed.
    pub async fn read_with_cancel(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize, HttpError> {
        let result = select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.read(buf) => Some(result),
        };

        match result {
            Some(result) => result,
            None => {
                debug!("response body read canceled");
                self.state = BodyState::Canceled;
                self.pending = Bytes::new();
                self.connection = None;
                Err(HttpError::Canceled)
            }
        }
    }

    fn copy_out(&mut self, mut bytes: Bytes, buf: &mut [u8]) -> usize {
        let n = cmp::min(buf.len(), bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        bytes.advance(n);
        self.pending = bytes;
        n
    }

    /// Gives the connection back for another request.
    ///
    /// Only possible once the body was read to the end and the connection is in a
    /// state to carry another exchange: HTTP/1.1, not close-delimited, no
    /// `Connection: close` and no skipped request body.
    pub fn into_connection(mut self) -> Option<HttpConnection<R, W>> {
        if !self.is_finished() || !self.reusable {
            return None;
        }
        self.connection.take().filter(|connection| connection.is_idle())
    }

    /// Takes the raw stream halves, e.g. after `101 Switching Protocols`.
    ///
    /// The returned buffer holds bytes that were already read from the stream but
    /// not consumed as body data.
    pub fn into_inner(mut self) -> Result<(R, W, BytesMut), HttpError> {
        let Some(connection) = self.connection.take() else {
            return Err(HttpError::invalid_request_state("response body has no connection"));
        };

        let (reader, writer, read_buf) = connection.into_parts();
        if self.pending.is_empty() {
            return Ok((reader, writer, read_buf));
        }

        let mut buffered = BytesMut::with_capacity(self.pending.len() + read_buf.len());
        buffered.extend_from_slice(&self.pending);
        buffered.extend_from_slice(&read_buf);
        Ok((reader, writer, buffered))
    }

    /// Reads the rest of the body into memory.
    pub async fn into_buffered(mut self) -> Result<BufferedBody, HttpError> {
        let mut data = BytesMut::new();
        while let Some(frame) = self.frame().await {
            if let Ok(bytes) = frame?.into_data() {
                data.extend_from_slice(&bytes);
            }
        }
        Ok(BufferedBody::new(data.freeze(), self.trailers.take()))
    }
}

impl<R, W> AsyncRead for ResponseBody<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        match ready!(this.poll_data(cx)) {
            Ok(Some(mut bytes)) => {
                let n = cmp::min(buf.remaining(), bytes.len());
                buf.put_slice(&bytes[..n]);
                bytes.advance(n);
                this.pending = bytes;
                Poll::Ready(Ok(()))
            }
            Ok(None) => Poll::Ready(Ok(())),
            Err(e) => Poll::Ready(Err(io::Error::other(e))),
        }
    }
}

impl<R, W> Body for ResponseBody<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    type Data = Bytes;
    type Error = HttpError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        match ready!(this.poll_data(cx)) {
            Ok(Some(bytes)) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
            Ok(None) if this.trailers_delivered => Poll::Ready(None),
            Ok(None) => {
                this.trailers_delivered = true;
                Poll::Ready(this.trailers.as_ref().map(|trailers| Ok(Frame::trailers(trailers.to_header_map()))))
            }
            Err(e) => Poll::Ready(Some(Err(e))),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.is_finished() && (self.trailers_delivered || self.trailers.is_none())
    }

    fn size_hint(&self) -> SizeHint {
        if self.is_finished() {
            return SizeHint::with_exact(0);
        }
        match self.payload_size {
            PayloadSize::Empty => SizeHint::with_exact(0),
            PayloadSize::Length(length) => SizeHint::with_exact(length.saturating_sub(self.received) + self.pending.len() as u64),
            PayloadSize::Chunked | PayloadSize::UntilClose => SizeHint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientConfig, ErrorKind, Request, Response};
    use crate::test_util::{TestServer, connection_pair};
    use http_body_util::Empty;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream, ReadHalf, WriteHalf};

    type TestBody = ResponseBody<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    async fn respond(head_and_body: &'static [u8]) -> (Response<TestBody>, TestServer) {
        let (connection, mut server) = connection_pair(ClientConfig::default());
        let request = Request::builder().uri("http://example.com/").body(Empty::<Bytes>::new()).unwrap();

        let cancel = CancellationToken::new();
        let send = connection.send(request, &cancel);
        let serve = async {
            server.read_request().await;
            server.write(head_and_body).await;
        };
        let (response, ()) = tokio::join!(send, serve);
        (response.unwrap(), server)
    }

    async fn read_pattern(body: &mut TestBody) -> Vec<String> {
        let mut reads = Vec::new();
        for size in [1, 1, 1, 1, 1, 1] {
            let mut buf = vec![0u8; size];
            let n = body.read(&mut buf).await.unwrap();
            reads.push(String::from_utf8(buf[..n].to_vec()).unwrap());
        }
        let mut buf = vec![0u8; 64];
        let n = body.read(&mut buf).await.unwrap();
        reads.push(String::from_utf8(buf[..n].to_vec()).unwrap());
        for _ in 0..3 {
            assert_eq!(body.read(&mut buf).await.unwrap(), 0);
        }
        reads
    }

    #[tokio::test]
    async fn well_behaved_streams() {
        let responses: [&'static [u8]; 3] = [
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nb\r\nhello world\r\n0\r\n\r\n",
            b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world",
            b"HTTP/1.1 200 OK\r\n\r\nhello world",
        ];

        for response in responses {
            let (response, mut server) = respond(response).await;
            let mut body = response.into_body();
            if body.payload_size().is_until_close() {
                server.shutdown().await;
            }

            let reads = read_pattern(&mut body).await;
            assert_eq!(reads, vec!["h", "e", "l", "l", "o", " ", "world", ""]);
            assert_eq!(body.read(&mut []).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn zero_length_buffer_does_not_read() {
        let (response, _server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n").await;
        let mut body = response.into_body();

        let read = tokio::time::timeout(Duration::from_millis(50), body.read(&mut [])).await;
        assert_eq!(read.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn short_content_length() {
        let (response, mut server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 16000\r\n\r\nabcdef").await;
        server.shutdown().await;
        let mut body = response.into_body();

        let mut buf = vec![0u8; 16000];
        let mut total = 0;
        let error = loop {
            match body.read(&mut buf).await {
                Ok(0) => panic!("short body must not end cleanly"),
                Ok(n) => total += n,
                Err(e) => break e,
            }
        };
        assert_eq!(total, 6);
        assert_eq!(error.kind(), ErrorKind::IncompleteResponse);
    }

    #[tokio::test]
    async fn truncated_chunk() {
        let (response, mut server) = respond(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhel").await;
        server.shutdown().await;

        let error = response.into_body().into_buffered().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IncompleteResponse);
    }

    #[tokio::test]
    async fn endless_chunk_whitespace() {
        let (response, mut server) = respond(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1").await;

        let writer = tokio::spawn(async move {
            let spaces = vec![b' '; 4096];
            for _ in 0..64 {
                if !server.try_write(&spaces).await {
                    break;
                }
            }
        });

        let error = response.into_body().into_buffered().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedChunk);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_pending_read() {
        let (response, _server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n").await;
        let mut body = response.into_body();
        let cancel = CancellationToken::new();

        let canceler = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceler.cancel();
        });

        let mut buf = [0u8; 10];
        let result = tokio::time::timeout(Duration::from_secs(5), body.read_with_cancel(&mut buf, &cancel)).await.unwrap();
        assert!(result.unwrap_err().is_canceled());

        assert!(body.read(&mut buf).await.unwrap_err().is_canceled());
        assert!(body.into_connection().is_none());
    }

    #[tokio::test]
    async fn already_canceled_read() {
        let (response, _server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
        let mut body = response.into_body();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut buf = [0u8; 2];
        assert!(body.read_with_cancel(&mut buf, &cancel).await.unwrap_err().is_canceled());
    }

    #[tokio::test]
    async fn async_read_impl() {
        let (response, _server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world").await;
        let mut body = response.into_body();

        let mut text = String::new();
        body.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "hello world");
        assert!(body.is_finished());
    }

    #[tokio::test]
    async fn trailers_after_body() {
        let (response, _server) =
            respond(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\nX-Checksum: 900150983cd24fb0\r\n\r\n").await;
        let mut body = response.into_body();

        let data = body.frame().await.unwrap().unwrap();
        assert_eq!(data.into_data().unwrap(), Bytes::from_static(b"abc"));
        assert!(body.trailers().is_none());

        let trailers = body.frame().await.unwrap().unwrap().into_trailers().unwrap();
        assert_eq!(trailers.get("x-checksum").unwrap(), "900150983cd24fb0");
        assert!(body.frame().await.is_none());
        assert!(body.is_end_stream());

        assert_eq!(body.trailers().unwrap().get("x-checksum").unwrap(), "900150983cd24fb0");
    }

    #[tokio::test]
    async fn buffered_body_keeps_trailers() {
        let (response, _server) = respond(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\nX-T: 1\r\n\r\n").await;
        let buffered = response.into_body().into_buffered().await.unwrap();
        assert_eq!(buffered.len(), 2);
        assert_eq!(buffered.trailers().unwrap().get("x-t").unwrap(), "1");
    }

    #[tokio::test]
    async fn size_hints() {
        let (response, _server) = respond(b"HTTP/1.1 204 No Content\r\n\r\n").await;
        assert_eq!(response.body().size_hint().exact(), Some(0));

        let (response, _server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nab").await;
        let mut body = response.into_body();
        assert_eq!(body.size_hint().exact(), Some(4));
        let mut buf = [0u8; 1];
        body.read(&mut buf).await.unwrap();
        assert_eq!(body.size_hint().exact(), Some(3));
    }

    #[tokio::test]
    async fn dropping_body_closes_connection() {
        let (response, mut server) = respond(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial").await;
        drop(response);

        assert!(server.try_read_for(Duration::from_millis(500)).await.is_empty());
        assert!(server.is_closed().await);
    }
}
