use crate::callback;
use crate::config::Config;
use crate::errors::ProxyError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::params::QueryTarget;
use crate::product::ProductPayload;
use crate::resolver::{HttpRedirectFollower, ProductReferenceResolver, Reference};
use crate::upstream::UpstreamExecutor;
use http::{Method, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use metrics::Gauge;
use serde_json::json;
use shared::http::json_response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

const QUERY_PARAM: &str = "query";

/// The caller's search phrase, product URL or product id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryInput(String);

impl QueryInput {
    /// Reads `query` from a raw query string. A missing parameter falls back to
    /// `default`; a blank one is rejected.
    pub fn from_query_string(raw: Option<&str>, default: &str) -> Result<Self, ProxyError> {
        let value = raw.and_then(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .find(|(key, _)| key == QUERY_PARAM)
                .map(|(_, value)| value.into_owned())
        });

        match value {
            None => Ok(QueryInput(default.to_string())),
            Some(value) if value.trim().is_empty() => Err(ProxyError::EmptyQuery),
            Some(value) => Ok(QueryInput(value.trim().to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Holds one unit of the inflight gauge until dropped, including when the
/// request future is cancelled by a client disconnect.
struct InflightGuard(Gauge);

impl InflightGuard {
    fn enter(gauge: Gauge) -> Self {
        gauge.increment(1.0);
        InflightGuard(gauge)
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.0.decrement(1.0);
    }
}

/// Request handling shared by every connection. Read-only once built.
pub struct Gateway {
    resolver: ProductReferenceResolver,
    executor: UpstreamExecutor,
    default_query: String,
}

impl Gateway {
    pub fn new(config: &Config) -> Result<Self, ProxyError> {
        let follower = HttpRedirectFollower::new(&config.resolver)?;
        let executor = UpstreamExecutor::new(config.upstream.clone(), config.credentials.clone())?;

        Ok(Self::from_parts(
            ProductReferenceResolver::new(Arc::new(follower)),
            executor,
            config.default_query.clone(),
        ))
    }

    pub fn from_parts(
        resolver: ProductReferenceResolver,
        executor: UpstreamExecutor,
        default_query: String,
    ) -> Self {
        Self {
            resolver,
            executor,
            default_query,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.executor.has_credentials()
    }

    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let started = Instant::now();
        let _inflight = InflightGuard::enter(shared::gauge!(REQUESTS_INFLIGHT));

        let (route, response) = match (request.method(), request.uri().path()) {
            (&Method::GET, "/" | "/search") => ("query", self.handle_query(&request).await),
            (&Method::GET, "/health") => (
                "health",
                json_response(StatusCode::OK, &json!({ "status": "healthy" })),
            ),
            (&Method::GET | &Method::POST, "/callback") => {
                ("callback", callback::acknowledge(&request))
            }
            _ => ("unknown", error_response(&ProxyError::NoRouteMatched)),
        };

        shared::histogram!(
            REQUEST_DURATION,
            "route" => route,
            "status" => response.status().as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        response
    }

    async fn handle_query(&self, request: &Request<Bytes>) -> Response<Bytes> {
        match self.query(request.uri().query()).await {
            Ok(payload) => json_response(StatusCode::OK, &payload),
            Err(e) => {
                if e.status().is_server_error() {
                    tracing::error!(error = %e, "Query failed");
                } else {
                    tracing::info!(error = %e, "Query rejected");
                }
                error_response(&e)
            }
        }
    }

    pub async fn query(&self, raw_query: Option<&str>) -> Result<ProductPayload, ProxyError> {
        let input = QueryInput::from_query_string(raw_query, &self.default_query)?;

        let target = match self.resolver.resolve(input.as_str()).await {
            Reference::ProductId(id) => QueryTarget::Product(id),
            Reference::SearchTerm(term) => QueryTarget::Search(term),
            Reference::Unresolved(link) => return Err(ProxyError::InvalidReference(link)),
        };

        tracing::debug!(kind = target.kind(), "Querying upstream");
        self.executor.execute(&target).await
    }
}

fn error_response(error: &ProxyError) -> Response<Bytes> {
    json_response(error.status(), &error.to_body())
}

pub struct GatewayService {
    gateway: Arc<Gateway>,
}

impl GatewayService {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<BoxBody<Bytes, ProxyError>>;
    type Error = ProxyError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let gateway = self.gateway.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let response = match body.collect().await {
                Ok(collected) => {
                    let request = Request::from_parts(parts, collected.to_bytes());
                    gateway.dispatch(request).await
                }
                Err(e) => error_response(&ProxyError::RequestBody(e.to_string())),
            };

            Ok(response.map(|body| Full::new(body).map_err(|e| match e {}).boxed()))
        })
    }
}
