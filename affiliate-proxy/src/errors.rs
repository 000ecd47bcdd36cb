use crate::signing::SigningError;
use http::StatusCode;
use serde::Serialize;
use std::io;

/// Errors that can occur while serving a request
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("query parameter must not be empty")]
    EmptyQuery,

    #[error("could not resolve product reference: {0}")]
    InvalidReference(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream error: {message}")]
    UpstreamProtocol {
        message: String,
        detail: Option<serde_json::Value>,
    },

    #[error("no products found")]
    NotFound,

    #[error("no route matched for request")]
    NoRouteMatched,

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<SigningError> for ProxyError {
    fn from(e: SigningError) -> Self {
        ProxyError::Configuration(e.to_string())
    }
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::EmptyQuery
            | ProxyError::InvalidReference(_)
            | ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotFound | ProxyError::NoRouteMatched => StatusCode::NOT_FOUND,
            ProxyError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Configuration(_)
            | ProxyError::UpstreamProtocol { .. }
            | ProxyError::HttpClient(_)
            | ProxyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Remediation hint shown to the caller next to the message.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ProxyError::EmptyQuery => {
                Some("pass a search phrase, product URL or product id as ?query=")
            }
            ProxyError::InvalidReference(_) => {
                Some("check that the link opens a product page, or search by name instead")
            }
            ProxyError::Configuration(_) => {
                Some("set AFFILIATE_APP_KEY and AFFILIATE_APP_SECRET for the gateway")
            }
            ProxyError::UpstreamUnavailable(_) => {
                Some("the affiliate API is unreachable, try again later")
            }
            ProxyError::NotFound => Some("try a broader search phrase"),
            _ => None,
        }
    }

    /// Stable label used for metrics tagging.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::EmptyQuery => "empty_query",
            ProxyError::InvalidReference(_) => "invalid_reference",
            ProxyError::Configuration(_) => "configuration",
            ProxyError::UpstreamUnavailable(_) => "upstream_unavailable",
            ProxyError::UpstreamProtocol { .. } => "upstream_protocol",
            ProxyError::NotFound => "not_found",
            ProxyError::NoRouteMatched => "no_route",
            ProxyError::RequestBody(_) => "request_body",
            ProxyError::HttpClient(_) => "http_client",
            ProxyError::Io(_) => "io",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let detail = match self {
            ProxyError::UpstreamProtocol { detail, .. } => detail.clone(),
            _ => None,
        };

        ErrorBody {
            error: self.to_string(),
            help: self.help(),
            details: detail,
        }
    }
}

/// JSON error record returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
