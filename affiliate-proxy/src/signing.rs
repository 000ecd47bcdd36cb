//! Request signing for the affiliate API.
//!
//! Parameters are sorted by key, joined into a canonical string, wrapped with
//! the shared secret on both sides and hashed with MD5. The digest is rendered
//! as uppercase hex and sent as the `sign` parameter.
//!
//! Two canonical forms are in use by clients of this API and they produce
//! different signatures under the same secret, so the form is an explicit
//! choice rather than something inferred:
//!
//! - [`Canonicalization::Concatenated`]: `key1value1key2value2`
//! - [`Canonicalization::QueryString`]: `key1=value1&key2=value2`

use md5::{Digest, Md5};
use serde::Deserialize;

/// Name of the parameter carrying the signature. Never part of the signed input.
pub const SIGN_KEY: &str = "sign";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SigningError {
    #[error("shared secret is not configured")]
    MissingSecret,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Canonicalization {
    #[default]
    Concatenated,
    QueryString,
}

impl Canonicalization {
    fn canonicalize(&self, sorted: &[(&str, &str)]) -> String {
        match self {
            Canonicalization::Concatenated => sorted
                .iter()
                .fold(String::new(), |mut acc, (key, value)| {
                    acc.push_str(key);
                    acc.push_str(value);
                    acc
                }),
            Canonicalization::QueryString => sorted
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("&"),
        }
    }
}

/// Computes the signature over `params`. Insertion order does not matter, the
/// parameters are sorted byte-wise by key (then value) before joining.
pub fn sign<'a, I>(
    params: I,
    secret: &str,
    canonicalization: Canonicalization,
) -> Result<String, SigningError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    if secret.is_empty() {
        return Err(SigningError::MissingSecret);
    }

    let mut sorted: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(key, _)| *key != SIGN_KEY)
        .collect();
    sorted.sort_unstable();

    let canonical = canonicalization.canonicalize(&sorted);

    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    hasher.update(canonical.as_bytes());
    hasher.update(secret.as_bytes());

    Ok(hex::encode_upper(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test-secret";

    fn sample_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("method", "aliexpress.affiliate.product.query"),
            ("app_key", "12345678"),
            ("timestamp", "2024-01-02 03:04:05"),
            ("sign_method", "md5"),
            ("keywords", "wireless earbuds"),
        ]
    }

    #[test]
    fn test_concatenated_signature() {
        let signature = sign(sample_params(), SECRET, Canonicalization::Concatenated).unwrap();
        assert_eq!(signature, "DFF8DD2FB45129FEE20D1CED14EDD13C");
    }

    #[test]
    fn test_query_string_signature() {
        let signature = sign(sample_params(), SECRET, Canonicalization::QueryString).unwrap();
        assert_eq!(signature, "70A1EFECA30C75E21D9A4D51DCF1D653");
    }

    #[test]
    fn test_sign_key_is_excluded() {
        let mut params = sample_params();
        let expected = sign(params.clone(), SECRET, Canonicalization::Concatenated).unwrap();

        params.push((SIGN_KEY, "STALE"));
        let signature = sign(params, SECRET, Canonicalization::Concatenated).unwrap();
        assert_eq!(signature, expected);
    }

    #[test]
    fn test_secret_wraps_canonical_string() {
        // secret + "bar" + "foo1" + secret
        let signature = sign([("bar", "foo1")], "secret", Canonicalization::Concatenated).unwrap();
        assert_eq!(signature, "500183BA1E8F43A6DB76B31283281202");
        assert_eq!(signature.len(), 32);
        assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_empty_secret() {
        assert_eq!(
            sign(sample_params(), "", Canonicalization::Concatenated),
            Err(SigningError::MissingSecret)
        );
        assert_eq!(
            sign(sample_params(), "", Canonicalization::QueryString),
            Err(SigningError::MissingSecret)
        );
    }

    fn original_and_shuffled() -> impl Strategy<Value = (Vec<(String, String)>, Vec<(String, String)>)>
    {
        prop::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,24}", 1..16).prop_flat_map(|map| {
            let pairs: Vec<(String, String)> = map.into_iter().collect();
            (Just(pairs.clone()), Just(pairs).prop_shuffle())
        })
    }

    fn borrowed(pairs: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
        pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    proptest! {
        #[test]
        fn signature_ignores_insertion_order(
            (original, shuffled) in original_and_shuffled(),
            secret in "[A-Za-z0-9]{1,32}",
        ) {
            for canonicalization in [Canonicalization::Concatenated, Canonicalization::QueryString] {
                let a = sign(borrowed(&original), &secret, canonicalization).unwrap();
                let b = sign(borrowed(&shuffled), &secret, canonicalization).unwrap();
                prop_assert_eq!(a, b);
            }
        }
    }
}
