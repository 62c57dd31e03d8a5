//! Fetches a URL over plain TCP and prints the response.
//!
//! ```sh
//! cargo run -p micro-http-client --example get -- http://127.0.0.1:3000/
//! ```

use bytes::Bytes;
use http_body_util::Empty;
use micro_http_client::client::Client;
use micro_http_client::connection::TcpConnector;
use micro_http_client::protocol::Request;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let uri = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:3000/".to_string());
    let request = match Request::builder().uri(uri.as_str()).header("Accept", "*/*").body(Empty::<Bytes>::new()) {
        Ok(request) => request,
        Err(e) => {
            error!(cause = %e, "invalid request");
            return;
        }
    };

    let client = Client::new(TcpConnector::new());

    // ctrl-c abandons whatever the exchange is waiting for
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let response = match client.send(request, &cancel).await {
        Ok(response) => response,
        Err(e) => {
            error!(cause = %e, kind = ?e.kind(), "request failed");
            return;
        }
    };

    info!(version = ?response.version(), status = response.status(), reason = response.reason(), "received response head");
    for field in response.headers() {
        info!(name = %field.name(), value = ?field.value(), "header");
    }

    let mut body = response.into_body();
    let mut buf = vec![0u8; 8 * 1024];
    let mut total = 0usize;
    loop {
        match body.read_with_cancel(&mut buf, &cancel).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                print!("{}", String::from_utf8_lossy(&buf[..n]));
            }
            Err(e) => {
                error!(cause = %e, "failed to read body");
                return;
            }
        }
    }

    if let Some(trailers) = body.trailers() {
        for field in trailers {
            info!(name = %field.name(), value = ?field.value(), "trailer");
        }
    }
    info!(total, "finished");
}
