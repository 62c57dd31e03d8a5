//! The client front end: connect, send, and cancel on shutdown.

use http_body::Body;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::{Connect, HttpConnection};
use crate::protocol::body::ResponseBody;
use crate::protocol::{BoxError, ClientConfig, HttpError, Request, Response};

/// Response type produced by a [`Client`] using connector `C`.
pub type ClientResponse<C> = Response<ResponseBody<ReadHalf<<C as Connect>::Stream>, WriteHalf<<C as Connect>::Stream>>>;

/// Sends requests over fresh connections from a [`Connect`] implementation.
///
/// Disposing the client (explicitly or by dropping it) cancels every exchange
/// that is still waiting for its response head. Responses already handed out
/// keep streaming their bodies.
#[derive(Debug)]
pub struct Client<C> {
    connector: C,
    config: ClientConfig,
    shutdown: CancellationToken,
}

impl<C: Connect> Client<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, ClientConfig::default())
    }

    pub fn with_config(connector: C, config: ClientConfig) -> Self {
        Self { connector, config, shutdown: CancellationToken::new() }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request` and resolves once the final response head arrived.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`HttpConnection::send`], fails with
    /// [`HttpError::Connect`] when no stream could be opened and with
    /// [`HttpError::InvalidRequestState`] once the client is disposed.
    pub async fn send<B>(&self, request: Request<B>, cancel: &CancellationToken) -> Result<ClientResponse<C>, HttpError>
    where
        B: Body + Unpin,
        B::Error: Into<BoxError>,
    {
        if self.shutdown.is_cancelled() {
            return Err(HttpError::invalid_request_state("client is disposed"));
        }

        let uri = request.head().target()?.clone();

        let stream = select! {
            biased;
            () = self.shutdown.cancelled() => return Err(HttpError::Canceled),
            () = cancel.cancelled() => return Err(HttpError::Canceled),
            stream = self.connector.connect(&uri) => stream.map_err(HttpError::connect)?,
        };
        debug!(%uri, "connected");

        let (reader, writer) = tokio::io::split(stream);
        let connection = HttpConnection::with_config(reader, writer, self.config.clone());

        select! {
            biased;
            () = self.shutdown.cancelled() => {
                info!(%uri, "client disposed before the response head arrived");
                Err(HttpError::Canceled)
            }
            response = connection.send(request, cancel) => response,
        }
    }

    /// Cancels all exchanges still waiting for a response head and refuses new ones.
    pub fn dispose(&self) {
        if !self.shutdown.is_cancelled() {
            info!("disposing client");
            self.shutdown.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl<C> Drop for Client<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
