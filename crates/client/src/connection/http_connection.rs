use std::task::{Context, Poll};

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use http::header::CONTENT_LENGTH;
use http::{Method, Version};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::time::sleep;
use tokio_util::codec::{FramedParts, FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::ensure;
use crate::protocol::body::ResponseBody;
use crate::protocol::{
    BoxError, ClientConfig, HeaderFields, HttpError, Message, ParseError, PayloadItem, PayloadSize, Request, RequestHead, Response,
    ResponseHead,
};

/// A client side HTTP/1.x connection running one exchange at a time.
///
/// `HttpConnection` handles the full lifecycle of an exchange:
/// - Validating the request and choosing its body framing
/// - Writing the request head and body
/// - Handling the expect-continue handshake
/// - Skipping interim responses and handing the final one to the caller
///
/// The response body owns the connection while it streams. Once the body is fully
/// read, [`ResponseBody::into_connection`] gives the connection back if it can
/// carry another request.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, ResponseDecoder>,
    framed_write: FramedWrite<W, RequestEncoder>,
    config: ClientConfig,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, ClientConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: ClientConfig) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, ResponseDecoder::new(&config), config.read_buffer_capacity()),
            framed_write: FramedWrite::new(writer, RequestEncoder::new(config.allow_high_byte_header_values())),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request` and waits for the final response head.
    ///
    /// Interim responses are consumed and dropped. The returned response streams
    /// its body from this connection.
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidRequestState`] / [`HttpError::UnsupportedScheme`] when the
    ///   request can't be sent at all; nothing is written in that case
    /// - [`HttpError::Canceled`] when `cancel` fires before the head is received
    /// - [`HttpError::BodyReadFailure`] when the request body fails
    /// - [`HttpError::ResponseError`] / [`HttpError::RequestError`] on wire failures
    pub async fn send<B>(mut self, request: Request<B>, cancel: &CancellationToken) -> Result<Response<ResponseBody<R, W>>, HttpError>
    where
        B: Body + Unpin,
        B::Error: Into<BoxError>,
    {
        let (head, body) = request.into_parts();
        let payload_size = prepare_request(&head, &body)?;

        let head_request = *head.method() == Method::HEAD;
        self.framed_read.decoder_mut().set_head_request(head_request);

        let exchange = self.exchange(head, payload_size, body);
        let (response_head, response_size, body_skipped) = select! {
            biased;
            () = cancel.cancelled() => {
                info!("request canceled before the response head arrived");
                return Err(HttpError::Canceled);
            }
            result = exchange => result?,
        };

        // a switched connection no longer speaks HTTP/1.x
        let reusable = !body_skipped
            && !response_head.is_informational()
            && !response_size.is_until_close()
            && response_head.version() == Version::HTTP_11
            && !response_head.headers().has_connection_close();

        debug!(status = response_head.status(), ?response_size, reusable, "received final response");
        Ok(Response::from_parts(response_head, ResponseBody::new(self, response_size, reusable)))
    }

    async fn exchange<B>(&mut self, head: RequestHead, payload_size: PayloadSize, body: B) -> Result<(ResponseHead, PayloadSize, bool), HttpError>
    where
        B: Body + Unpin,
        B::Error: Into<BoxError>,
    {
        let has_body = !matches!(payload_size, PayloadSize::Empty | PayloadSize::Length(0));
        let wait_continue = has_body && head.expect_continue();

        let header = Message::<_, B::Data>::Header((head, payload_size));
        if has_body && !wait_continue {
            // the body follows right away, flush them together
            self.framed_write.feed(header).await?;
        } else {
            self.framed_write.send(header).await?;
        }

        let mut early_response = None;
        if wait_continue {
            early_response = self.wait_continue().await?;
        }

        if early_response.is_some() {
            info!("server answered before the request body was sent, skipping body");
            self.framed_write.encoder_mut().abandon_body();
        } else if payload_size.is_empty() {
            trace!("request has no body");
        } else {
            self.send_body(body).await?;
        }

        let body_skipped = early_response.is_some();
        let (response_head, response_size) = match early_response {
            Some(final_head) => final_head,
            None => self.read_final_head().await?,
        };
        Ok((response_head, response_size, body_skipped))
    }

    /// Waits for `100 Continue` before the body goes out.
    ///
    /// Returns the final response when the server skipped the handshake.
    async fn wait_continue(&mut self) -> Result<Option<(ResponseHead, PayloadSize)>, HttpError> {
        let timeout = sleep(self.config.expect_continue_timeout());
        tokio::pin!(timeout);

        loop {
            select! {
                biased;
                result = self.next_head() => {
                    let (head, size) = result?;
                    if head.is_continue() {
                        debug!("received 100 continue, sending body");
                        return Ok(None);
                    }
                    if head.is_interim() {
                        debug!(status = head.status(), "dropping interim response while waiting for 100 continue");
                        continue;
                    }
                    return Ok(Some((head, size)));
                }
                () = &mut timeout => {
                    debug!(timeout = ?self.config.expect_continue_timeout(), "no 100 continue received in time, sending body");
                    return Ok(None);
                }
            }
        }
    }

    async fn send_body<B>(&mut self, mut body: B) -> Result<(), HttpError>
    where
        B: Body + Unpin,
        B::Error: Into<BoxError>,
    {
        loop {
            match body.frame().await {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        self.framed_write.feed(Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(data))).await?;
                    }
                    Err(_) => warn!("request trailers are not supported, dropping them"),
                },
                Some(Err(e)) => {
                    error!("request body source failed");
                    return Err(HttpError::body_read_failure(e));
                }
                None => {
                    self.framed_write.send(Message::<(RequestHead, PayloadSize), B::Data>::Payload(PayloadItem::Eof)).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn read_final_head(&mut self) -> Result<(ResponseHead, PayloadSize), HttpError> {
        loop {
            let (head, size) = self.next_head().await?;
            if head.is_interim() {
                debug!(status = head.status(), "dropping interim response");
                continue;
            }
            return Ok((head, size));
        }
    }

    async fn next_head(&mut self) -> Result<(ResponseHead, PayloadSize), HttpError> {
        match self.framed_read.next().await {
            Some(Ok(Message::Header(header))) => Ok(header),
            Some(Ok(Message::Payload(_))) => {
                error!("expect response head but receive payload item");
                Err(ParseError::incomplete_response("payload data before the response head").into())
            }
            Some(Err(e)) => {
                error!("can't read response head, cause {}", e);
                Err(e.into())
            }
            None => Err(ParseError::incomplete_response("connection closed before the response head").into()),
        }
    }

    pub(crate) fn poll_payload(&mut self, cx: &mut Context<'_>) -> Poll<Result<PayloadItem, ParseError>> {
        match self.framed_read.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(Message::Payload(item)))) => Poll::Ready(Ok(item)),
            Poll::Ready(Some(Ok(Message::Header(_)))) => {
                Poll::Ready(Err(ParseError::malformed_header("response head received inside a response body")))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Err(e)),
            Poll::Ready(None) => Poll::Ready(Err(ParseError::incomplete_response("connection closed inside response body"))),
        }
    }

    /// Whether the last exchange left nothing half written or half read.
    pub(crate) fn is_idle(&self) -> bool {
        self.framed_read.decoder().is_idle() && !self.framed_write.encoder().in_body()
    }

    pub(crate) fn take_trailers(&mut self) -> Option<HeaderFields> {
        self.framed_read.decoder_mut().take_trailers()
    }

    /// Splits the connection into its halves and the bytes read past the last message.
    pub(crate) fn into_parts(self) -> (R, W, BytesMut) {
        let FramedParts { io: reader, read_buf, .. } = self.framed_read.into_parts();
        (reader, self.framed_write.into_inner(), read_buf)
    }
}

/// Validates a request and picks the framing of its body, before any I/O.
fn prepare_request<B: Body>(head: &RequestHead, body: &B) -> Result<PayloadSize, HttpError> {
    head.target()?;
    ensure!(head.version() != Version::HTTP_09, HttpError::invalid_request_state("HTTP/0.9 requests are not supported"));

    let caller_chunked = head.headers().is_chunked();
    let payload_size = match body.size_hint().exact() {
        Some(0) => {
            ensure!(
                !caller_chunked,
                HttpError::invalid_request_state("transfer-encoding chunked was requested without request content")
            );
            if [Method::POST, Method::PUT, Method::PATCH].contains(head.method()) { PayloadSize::Length(0) } else { PayloadSize::Empty }
        }
        Some(length) => PayloadSize::Length(length),
        None if caller_chunked => PayloadSize::Chunked,
        None => match declared_content_length(head.headers())? {
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::Chunked,
        },
    };

    ensure!(
        !(payload_size.is_chunked() && head.version() == Version::HTTP_10),
        HttpError::invalid_request_state("HTTP/1.0 requests need a known content length")
    );
    Ok(payload_size)
}

fn declared_content_length(headers: &HeaderFields) -> Result<Option<u64>, HttpError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| HttpError::invalid_request_state("request content-length is not a number"))
}
