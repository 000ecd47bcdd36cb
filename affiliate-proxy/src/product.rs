//! Upstream product records and the flat payload returned to callers.
//!
//! The affiliate API omits fields freely and mixes JSON strings and numbers for
//! the same field depending on the operation. Every field of [`ProductPayload`]
//! is always present; absent upstream values are replaced with the placeholders
//! below.
//!
//! | field                                         | placeholder        |
//! |-----------------------------------------------|--------------------|
//! | `title`                                       | `Untitled product` |
//! | `product_id`, `image`, `original_price`, `price_after`, `discount`, `affiliate_link` | `unavailable` |
//! | `coupon_code`                                 | `none`             |
//! | `rating`                                      | `no rating`        |
//! | `orders`                                      | `0`                |
//! | `free_shipping`                               | `unknown`          |
//! | `store`                                       | `unknown store`    |

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNTITLED: &str = "Untitled product";
pub const UNAVAILABLE: &str = "unavailable";
pub const NO_COUPON: &str = "none";
pub const NO_RATING: &str = "no rating";
pub const NO_ORDERS: &str = "0";
pub const UNKNOWN_SHIPPING: &str = "unknown";
pub const UNKNOWN_STORE: &str = "unknown store";

/// One upstream product record. Every field is optional, and a value of an
/// unexpected JSON type is treated as absent instead of failing the record.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct UpstreamProduct {
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_main_image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub target_original_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub original_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub target_sale_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sale_price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub discount: Option<String>,
    #[serde(default, deserialize_with = "lenient_promo")]
    pub promo_code_info: Option<PromoCodeInfo>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub coupon_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub promotion_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub affiliate_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_detail_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub evaluate_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lastest_volume: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub free_shipping: Option<bool>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub shop_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PromoCodeInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub promo_code: Option<String>,
}

/// Normalized success record sent to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductPayload {
    pub product_id: String,
    pub title: String,
    pub image: String,
    pub original_price: String,
    pub price_after: String,
    pub discount: String,
    pub coupon_code: String,
    pub affiliate_link: String,
    pub rating: String,
    pub orders: String,
    pub free_shipping: String,
    pub store: String,
}

impl From<UpstreamProduct> for ProductPayload {
    fn from(product: UpstreamProduct) -> Self {
        let promo_code = product.promo_code_info.and_then(|info| info.promo_code);

        ProductPayload {
            product_id: first_filled([product.product_id], UNAVAILABLE),
            title: first_filled([product.product_title, product.subject], UNTITLED),
            image: first_filled(
                [product.product_main_image_url, product.product_image],
                UNAVAILABLE,
            ),
            original_price: first_filled(
                [product.target_original_price, product.original_price],
                UNAVAILABLE,
            ),
            price_after: first_filled(
                [product.target_sale_price, product.sale_price],
                UNAVAILABLE,
            ),
            discount: first_filled([product.discount], UNAVAILABLE),
            coupon_code: first_filled([promo_code, product.coupon_code], NO_COUPON),
            affiliate_link: first_filled(
                [
                    product.promotion_link,
                    product.affiliate_link,
                    product.product_detail_url,
                ],
                UNAVAILABLE,
            ),
            rating: first_filled([product.evaluate_rate], NO_RATING),
            orders: first_filled([product.lastest_volume], NO_ORDERS),
            free_shipping: product
                .free_shipping
                .map(|free| if free { "yes" } else { "no" })
                .unwrap_or(UNKNOWN_SHIPPING)
                .to_string(),
            store: first_filled([product.shop_name], UNKNOWN_STORE),
        }
    }
}

/// First non-blank candidate, trimmed, or the placeholder.
fn first_filled<const N: usize>(candidates: [Option<String>; N], placeholder: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

/// Accepts `"12.5"`, `12.5`, `true` or `null`; arrays and objects count as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts JSON booleans, `1`/`0` and their string spellings. Anything else is unknown.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some(true),
            "false" | "0" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_promo<'de, D>(deserializer: D) -> Result<Option<PromoCodeInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| PromoCodeInfo::deserialize(value).ok()))
}
