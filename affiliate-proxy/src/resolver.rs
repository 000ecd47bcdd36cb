use crate::config::ResolverConfig;
use crate::errors::ProxyError;
use crate::metrics_defs::REFERENCE_RESOLUTIONS;
use async_trait::async_trait;
use regex::Regex;
use reqwest::redirect::Policy;
use std::sync::{Arc, LazyLock};
use url::Url;

// Product pages carry the id as `/<digits>.html` or `/item/<digits>`.
static PRODUCT_ID_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"/(\d+)\.html").expect("valid regex"),
        Regex::new(r"/item/(\d+)(?:[/?#]|$)").expect("valid regex"),
    ]
});

static BARE_PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10,}$").expect("valid regex"));

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("redirect resolution timed out")]
    Timeout,
    #[error("redirect resolution failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// What a caller string turned out to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    ProductId(String),
    SearchTerm(String),
    /// A link that could not be followed.
    Unresolved(String),
}

impl Reference {
    pub fn kind(&self) -> &'static str {
        match self {
            Reference::ProductId(_) => "product_id",
            Reference::SearchTerm(_) => "search_term",
            Reference::Unresolved(_) => "unresolved",
        }
    }
}

/// Follows redirects for a link and reports where it ends up.
#[async_trait]
pub trait RedirectFollower: Send + Sync {
    async fn final_url(&self, url: &Url) -> Result<Url, ResolveError>;
}

pub struct HttpRedirectFollower {
    client: reqwest::Client,
}

impl HttpRedirectFollower {
    pub fn new(config: &ResolverConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(config.max_redirects))
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProxyError::HttpClient(e.to_string()))?;

        Ok(HttpRedirectFollower { client })
    }
}

#[async_trait]
impl RedirectFollower for HttpRedirectFollower {
    async fn final_url(&self, url: &Url) -> Result<Url, ResolveError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                ResolveError::Timeout
            } else {
                ResolveError::Http(e)
            }
        })?;

        Ok(response.url().clone())
    }
}

#[derive(Clone)]
pub struct ProductReferenceResolver {
    follower: Arc<dyn RedirectFollower>,
}

impl ProductReferenceResolver {
    pub fn new(follower: Arc<dyn RedirectFollower>) -> Self {
        Self { follower }
    }

    pub async fn resolve(&self, input: &str) -> Reference {
        let reference = self.resolve_inner(input.trim()).await;
        shared::counter!(REFERENCE_RESOLUTIONS, "kind" => reference.kind()).increment(1);
        reference
    }

    async fn resolve_inner(&self, input: &str) -> Reference {
        if let Some(id) = extract_product_id(input) {
            return Reference::ProductId(id);
        }

        if BARE_PRODUCT_ID.is_match(input) {
            return Reference::ProductId(input.to_string());
        }

        let Some(url) = parse_link(input) else {
            return Reference::SearchTerm(input.to_string());
        };

        match self.follower.final_url(&url).await {
            Ok(final_url) => match extract_product_id(final_url.as_str()) {
                Some(id) => {
                    tracing::debug!(link = %url, resolved = %final_url, "Resolved product link");
                    Reference::ProductId(id)
                }
                None => Reference::SearchTerm(input.to_string()),
            },
            Err(e) => {
                tracing::warn!(link = %url, error = %e, "Could not resolve product link");
                Reference::Unresolved(input.to_string())
            }
        }
    }
}

/// Pulls the numeric product id out of a product URL, without any I/O.
pub fn extract_product_id(input: &str) -> Option<String> {
    PRODUCT_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(input)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn parse_link(input: &str) -> Option<Url> {
    if input.contains(char::is_whitespace) {
        return None;
    }

    Url::parse(input)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}
