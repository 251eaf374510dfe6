#![allow(dead_code)]

use axum::body::Bytes;
use axum::Router;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use mirrorgate_backend::test_util::sign_webhook;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(http::header::LOCATION).and_then(|v| v.to_str().ok())
    }
}

async fn dispatch(app: &Router, req: http::Request<axum::body::Body>) -> TestResponse {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse { status, headers, body }
}

pub async fn send_request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut req_builder = http::Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        req_builder = req_builder.header("Authorization", format!("Bearer {}", token));
    }
    if body.is_some() {
        req_builder = req_builder.header("Content-Type", "application/json");
    }

    let req = req_builder
        .body(match body {
            Some(b) => axum::body::Body::from(b.to_string()),
            None => axum::body::Body::empty(),
        })
        .unwrap();

    dispatch(app, req).await
}

/// POST a webhook delivery, signed unless `headers` overrides it.
pub async fn send_webhook(
    app: &Router,
    headers: Vec<(&'static str, String)>,
    body: &str,
) -> TestResponse {
    let mut req_builder = http::Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/clerk")
        .header("Content-Type", "application/json");
    for (name, value) in headers {
        req_builder = req_builder.header(name, value);
    }

    let req = req_builder
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    dispatch(app, req).await
}

pub async fn send_signed_webhook(app: &Router, delivery_id: &str, body: &Value) -> TestResponse {
    let body = body.to_string();
    send_webhook(app, sign_webhook(delivery_id, &body), &body).await
}
