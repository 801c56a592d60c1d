//! Keepalive HTTP listener
//!
//! The hosting platform's supervisor probes the assigned port to decide
//! whether the process is alive. The listener exists only to answer those
//! probes: it serves no routes and returns 404 for every request.
//! Uses hyper for the HTTP server.

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

fn not_found() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(Bytes::from("Not Found")))
        .expect("static response should not fail")
}

async fn handle_request(
    _req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(not_found())
}

/// Start the keepalive HTTP server
///
/// A bind failure is logged and swallowed: the device keeps publishing even
/// when the port is unavailable.
pub async fn start_keepalive_server(port: u16, mut shutdown: watch::Receiver<bool>) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            warn!(port = %port, "keepalive server not started, port is busy");
            return;
        }
        Err(e) => {
            warn!(port = %port, error = %e, "keepalive_bind_failed");
            return;
        }
    };

    info!(port = %port, "keepalive_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        tokio::spawn(async move {
                            let service = service_fn(handle_request);
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "keepalive_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "keepalive_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("keepalive_server_shutdown");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_is_not_found() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_failure_does_not_panic() {
        let (_tx, rx) = watch::channel(false);
        // Grab a port so the server's bind collides
        let blocker = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        let port = blocker.local_addr().unwrap().port();

        // Binding 0.0.0.0 on the same port fails with AddrInUse; the call
        // must return instead of crashing the process
        start_keepalive_server(port, rx).await;
    }
}
