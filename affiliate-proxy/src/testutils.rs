use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue, LOCATION};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

#[derive(Clone)]
pub struct CannedResponse {
    status: StatusCode,
    body: Bytes,
    delay: Option<Duration>,
    location: Option<&'static str>,
}

impl CannedResponse {
    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            body: Bytes::from(body),
            delay: None,
            location: None,
        }
    }

    /// A 302 pointing at `location`, which may be a path on the same server.
    pub fn redirect(location: &'static str) -> Self {
        Self {
            status: StatusCode::FOUND,
            body: Bytes::new(),
            delay: None,
            location: Some(location),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(location) = self.location {
            response
                .headers_mut()
                .insert(LOCATION, HeaderValue::from_static(location));
        }
        response
    }
}

async fn serve<F>(answer: F) -> u16
where
    F: Fn(&str) -> CannedResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");
    let port = listener.local_addr().unwrap().port();
    let answer = Arc::new(answer);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let io = TokioIo::new(stream);
            let answer = answer.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let canned = answer(req.uri().path());
                    async move {
                        if let Some(delay) = canned.delay {
                            tokio::time::sleep(delay).await;
                        }
                        Ok::<_, Infallible>(canned.into_response())
                    }
                });

                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    port
}

/// Starts a local upstream that answers every request with `canned`.
pub async fn spawn_upstream(canned: CannedResponse) -> Url {
    let port = serve(move |_path| canned.clone()).await;

    Url::parse(&format!("http://127.0.0.1:{port}/sync")).unwrap()
}

/// Starts a local server answering by request path. Unknown paths get a 404.
/// Returns the server's base URL.
pub async fn spawn_routes(routes: Vec<(&'static str, CannedResponse)>) -> Url {
    let routes: HashMap<&'static str, CannedResponse> = routes.into_iter().collect();
    let port = serve(move |path| {
        routes
            .get(path)
            .cloned()
            .unwrap_or_else(|| CannedResponse::json(StatusCode::NOT_FOUND, b"{}".to_vec()))
    })
    .await;

    Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
}

/// URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
}
