//! Passive acknowledgment endpoint for the affiliate platform.
//!
//! The platform verifies the callback URL with a GET carrying a challenge and
//! later POSTs notifications. Both are answered with the same success envelope
//! whatever the payload looks like; nothing is processed.

use crate::metrics_defs::CALLBACKS;
use http::{Method, StatusCode};
use hyper::body::Bytes;
use hyper::{Request, Response};
use serde::Serialize;
use serde_json::{Value, json};
use shared::http::json_response;

const CHALLENGE_PARAMS: &[&str] = &["code", "challenge", "echostr"];

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub code: u8,
    pub msg: &'static str,
    pub data: Value,
}

impl Acknowledgement {
    fn success(data: Value) -> Self {
        Acknowledgement {
            code: 0,
            msg: "success",
            data,
        }
    }
}

pub fn acknowledge(request: &Request<Bytes>) -> Response<Bytes> {
    let ack = if request.method() == Method::POST {
        let body = request.body();
        let is_json = serde_json::from_slice::<Value>(body).is_ok();
        tracing::info!(bytes = body.len(), is_json, "Received callback notification");
        shared::counter!(CALLBACKS, "kind" => "notification").increment(1);

        Acknowledgement::success(json!({ "received": "notification" }))
    } else {
        let challenge = request.uri().query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| CHALLENGE_PARAMS.iter().any(|name| key == name))
                .map(|(_, value)| value.into_owned())
        });
        tracing::info!(has_challenge = challenge.is_some(), "Received callback verification");
        shared::counter!(CALLBACKS, "kind" => "verification").increment(1);

        Acknowledgement::success(match challenge {
            Some(challenge) => json!({ "received": "verification", "challenge": challenge }),
            None => json!({ "received": "verification" }),
        })
    };

    json_response(StatusCode::OK, &ack)
}
