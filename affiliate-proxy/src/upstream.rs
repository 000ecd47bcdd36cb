use crate::config::{Credentials, UpstreamConfig, UpstreamMethod};
use crate::errors::ProxyError;
use crate::metrics_defs::{UPSTREAM_CALLS, UPSTREAM_DURATION};
use crate::params::{QueryTarget, RequestParams, format_timestamp};
use crate::product::{ProductPayload, UpstreamProduct};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;

pub const SIGN_METHOD: &str = "md5";
pub const RESPONSE_FORMAT: &str = "json";
pub const API_VERSION: &str = "2.0";

const RESP_CODE_OK: i64 = 200;

/// Issues exactly one signed call per query and maps the answer.
#[derive(Clone)]
pub struct UpstreamExecutor {
    client: reqwest::Client,
    config: UpstreamConfig,
    credentials: Credentials,
}

impl UpstreamExecutor {
    pub fn new(config: UpstreamConfig, credentials: Credentials) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProxyError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_complete()
    }

    /// Builds the signed parameter set for `target` as of `now`.
    pub fn build_params(
        &self,
        target: &QueryTarget,
        now: DateTime<Utc>,
    ) -> Result<RequestParams, ProxyError> {
        let app_key = self
            .credentials
            .app_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProxyError::Configuration("API key is not configured".into()))?;
        let secret = self.credentials.app_secret.as_deref().unwrap_or_default();

        let mut params = RequestParams::new();
        params
            .push("method", target.method())
            .push("app_key", app_key)
            .push("sign_method", SIGN_METHOD)
            .push("timestamp", format_timestamp(now))
            .push("format", RESPONSE_FORMAT)
            .push("v", API_VERSION)
            .push("target_currency", self.config.target_currency.as_str())
            .push("target_language", self.config.target_language.as_str());

        match target {
            QueryTarget::Search(keywords) => {
                params
                    .push("keywords", keywords.as_str())
                    .push("page_no", "1")
                    .push("page_size", self.config.page_size.to_string());
            }
            QueryTarget::Product(id) => {
                params.push("product_ids", id.as_str());
            }
        }

        if let Some(tracking_id) = self
            .credentials
            .tracking_id
            .as_deref()
            .filter(|id| !id.is_empty())
        {
            params.push("tracking_id", tracking_id);
        }

        Ok(params.sign(secret, self.config.canonicalization)?)
    }

    pub async fn execute(&self, target: &QueryTarget) -> Result<ProductPayload, ProxyError> {
        let params = self.build_params(target, Utc::now())?;

        let started = Instant::now();
        let body = self.send(&params).await;
        shared::histogram!(UPSTREAM_DURATION, "operation" => target.kind())
            .record(started.elapsed().as_secs_f64());

        let result = body.and_then(|body| map_response(&body));
        shared::counter!(
            UPSTREAM_CALLS,
            "operation" => target.kind(),
            "outcome" => call_outcome(&result)
        )
        .increment(1);

        result
    }

    async fn send(&self, params: &RequestParams) -> Result<Vec<u8>, ProxyError> {
        let url = self.config.url.clone();
        let request = match self.config.method {
            UpstreamMethod::Post => self.client.post(url).form(params.as_pairs()),
            UpstreamMethod::Get => self.client.get(url).query(params.as_pairs()),
        };

        let response = request.send().await.map_err(unavailable)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProxyError::UpstreamUnavailable(format!(
                "upstream responded with {status}"
            )));
        }

        let body = response.bytes().await.map_err(unavailable)?;

        if !status.is_success() {
            return Err(ProxyError::UpstreamProtocol {
                message: format!("upstream responded with {status}"),
                detail: serde_json::from_slice(&body).ok(),
            });
        }

        Ok(body.to_vec())
    }
}

/// Outcome tag for a finished call, after the body has been mapped.
fn call_outcome(result: &Result<ProductPayload, ProxyError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    }
}

fn unavailable(e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        tracing::warn!(error = %e, "Upstream request timed out");
        ProxyError::UpstreamUnavailable("request timed out".into())
    } else {
        tracing::warn!(error = %e, "Upstream request failed");
        ProxyError::UpstreamUnavailable(e.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    sub_msg: Option<String>,
}

#[derive(Deserialize)]
struct OperationResponse {
    resp_result: Option<RespResult>,
}

#[derive(Deserialize)]
struct RespResult {
    resp_code: Option<i64>,
    resp_msg: Option<String>,
    result: Option<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    products: Option<ProductList>,
}

/// Products stay raw so that only the one returned is ever decoded.
#[derive(Deserialize)]
struct ProductList {
    #[serde(default)]
    product: Vec<Value>,
}

/// Maps a raw upstream body to the caller payload.
///
/// Bodies look like `{"<operation>_response": {"resp_result": {...}}}` on
/// success and `{"error_response": {...}}` when the gateway rejects the call.
pub fn map_response(body: &[u8]) -> Result<ProductPayload, ProxyError> {
    let envelope: serde_json::Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| ProxyError::UpstreamProtocol {
            message: format!("invalid response body: {e}"),
            detail: None,
        })?;

    if let Some(error) = envelope.get("error_response") {
        let parsed = ErrorResponse::deserialize(error).ok();
        let message = parsed
            .and_then(|e| e.sub_msg.or(e.msg))
            .unwrap_or_else(|| "unknown upstream error".into());
        return Err(ProxyError::UpstreamProtocol {
            message,
            detail: Some(error.clone()),
        });
    }

    let operation = envelope
        .iter()
        .find(|(key, _)| key.ends_with("_response"))
        .map(|(_, value)| value)
        .ok_or_else(|| ProxyError::UpstreamProtocol {
            message: "response envelope missing".into(),
            detail: Some(Value::Object(envelope.clone())),
        })?;

    let operation =
        OperationResponse::deserialize(operation).map_err(|e| ProxyError::UpstreamProtocol {
            message: format!("unexpected response shape: {e}"),
            detail: Some(operation.clone()),
        })?;

    let Some(resp_result) = operation.resp_result else {
        return Err(ProxyError::UpstreamProtocol {
            message: "response is missing resp_result".into(),
            detail: None,
        });
    };

    if let Some(code) = resp_result.resp_code
        && code != RESP_CODE_OK
    {
        return Err(ProxyError::UpstreamProtocol {
            message: resp_result
                .resp_msg
                .unwrap_or_else(|| format!("upstream result code {code}")),
            detail: Some(serde_json::json!({ "resp_code": code })),
        });
    }

    let first = resp_result
        .result
        .and_then(|result| result.products)
        .and_then(|list| list.product.into_iter().next())
        .ok_or(ProxyError::NotFound)?;

    let product =
        UpstreamProduct::deserialize(&first).map_err(|e| ProxyError::UpstreamProtocol {
            message: format!("unexpected product record: {e}"),
            detail: Some(first.clone()),
        })?;

    Ok(ProductPayload::from(product))
}
