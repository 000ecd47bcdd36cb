use crate::signing::{self, Canonicalization, SIGN_KEY, SigningError};
use chrono::{DateTime, Utc};

pub const SEARCH_METHOD: &str = "aliexpress.affiliate.product.query";
pub const DETAIL_METHOD: &str = "aliexpress.affiliate.productdetail.get";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a single upstream call asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryTarget {
    Search(String),
    Product(String),
}

impl QueryTarget {
    pub fn method(&self) -> &'static str {
        match self {
            QueryTarget::Search(_) => SEARCH_METHOD,
            QueryTarget::Product(_) => DETAIL_METHOD,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueryTarget::Search(_) => "search",
            QueryTarget::Product(_) => "product",
        }
    }
}

/// Outbound parameters in wire order. Built fresh for every request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Signs everything collected so far and appends the result as `sign`.
    pub fn sign(
        mut self,
        secret: &str,
        canonicalization: Canonicalization,
    ) -> Result<Self, SigningError> {
        let signature = signing::sign(
            self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            secret,
            canonicalization,
        )?;
        self.pairs.retain(|(k, _)| k != SIGN_KEY);
        self.pairs.push((SIGN_KEY.to_string(), signature));
        Ok(self)
    }
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}
