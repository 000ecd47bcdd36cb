use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_http_service<S, E>(host: &str, port: u16, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "Listening for connections");
    let service_arc = Arc::new(service);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service_arc.clone();

        // Hand the connection to hyper; auto-detect h1/h2 on this socket
        tokio::spawn(async move {
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection closed with error");
            }
        });
    }
}

/// Serializes `value` as the JSON body of a response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Bytes> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Bytes::from(body));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            make_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Plain text response carrying the canonical reason of the status code.
pub fn make_error_response(status_code: StatusCode) -> Response<Bytes> {
    let message = status_code
        .canonical_reason()
        .unwrap_or("an error occurred");

    let mut response = Response::new(Bytes::from(message));
    *response.status_mut() = status_code;
    response
}
