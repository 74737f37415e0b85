//! Access log: one structured record per request.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use futures::stream::{self, StreamExt};
use http_body_util::{BodyExt, BodyStream, StreamBody};
use serde_json::Value;

use warden_common::constants::MAX_LOGGED_BODY_BYTES;
use warden_common::constants::headers::{X_FORWARDED_FOR, X_REAL_IP, X_REQUEST_ID};

/// JSON keys whose values never reach the log
const REDACTED_KEYS: [&str; 6] = [
    "password",
    "old_password",
    "new_password",
    "token",
    "captcha",
    "captcha_image",
];

const REDACTED: &str = "[redacted]";

pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let client_ip = client_ip(&request);
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let (request, request_body) = capture_request(request).await;
    let response = next.run(request).await;
    let (mut response, response_body) = capture_response(response).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), value);
    }

    let status = response.status().as_u16();
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    if status >= 500 {
        tracing::warn!(
            target: "warden::access",
            method = %method,
            path = %path,
            query = query.as_deref(),
            client_ip = %client_ip,
            request_id = %request_id,
            status = status,
            latency_ms = latency_ms,
            request_body = request_body.as_deref(),
            response_body = response_body.as_deref(),
            "request failed"
        );
    } else {
        tracing::info!(
            target: "warden::access",
            method = %method,
            path = %path,
            query = query.as_deref(),
            client_ip = %client_ip,
            request_id = %request_id,
            status = status,
            latency_ms = latency_ms,
            request_body = request_body.as_deref(),
            response_body = response_body.as_deref(),
            "request completed"
        );
    }

    response
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer
pub fn client_ip(request: &Request) -> String {
    let headers = request.headers();

    if let Some(first) = header_str(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real) = header_str(headers, X_REAL_IP)
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// JSON body that may fit the log limit. Streams of unknown length qualify.
fn loggable(headers: &HeaderMap, body: &Body) -> bool {
    let hint = body.size_hint();
    is_json(headers)
        && hint.exact() != Some(0)
        && hint.lower() <= MAX_LOGGED_BODY_BYTES as u64
        && hint
            .upper()
            .is_none_or(|upper| upper <= MAX_LOGGED_BODY_BYTES as u64)
}

async fn capture_request(request: Request) -> (Request, Option<String>) {
    if !loggable(request.headers(), request.body()) {
        return (request, None);
    }

    let (parts, body) = request.into_parts();
    let (body, bytes) = tee_body(body).await;
    (Request::from_parts(parts, body), bytes.map(|b| render_body(&b)))
}

async fn capture_response(response: Response) -> (Response, Option<String>) {
    if !loggable(response.headers(), response.body()) {
        return (response, None);
    }

    let (parts, body) = response.into_parts();
    let (body, bytes) = tee_body(body).await;
    (Response::from_parts(parts, body), bytes.map(|b| render_body(&b)))
}

/// Read up to `MAX_LOGGED_BODY_BYTES` of `body` for the log.
///
/// The returned body always yields the original frames, including a read
/// error or the unread remainder. The bytes are `None` when the body is too
/// large or fails.
async fn tee_body(mut body: Body) -> (Body, Option<Bytes>) {
    let mut frames: Vec<Result<_, axum::Error>> = Vec::new();
    let mut buffered: Vec<u8> = Vec::new();
    let mut data_only = true;

    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                match frame.data_ref() {
                    Some(data) => buffered.extend_from_slice(data),
                    None => data_only = false,
                }
                frames.push(Ok(frame));

                if buffered.len() > MAX_LOGGED_BODY_BYTES {
                    let replay = stream::iter(frames).chain(BodyStream::new(body));
                    return (Body::new(StreamBody::new(replay)), None);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Body failed while buffering for logging");
                frames.push(Err(e));
                return (Body::new(StreamBody::new(stream::iter(frames))), None);
            }
        }
    }

    let bytes = Bytes::from(buffered);
    let body = if data_only {
        Body::from(bytes.clone())
    } else {
        Body::new(StreamBody::new(stream::iter(frames)))
    };
    (body, Some(bytes))
}

/// Pretty-printed JSON with sensitive values masked
fn render_body(bytes: &Bytes) -> String {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            redact(&mut value);
            serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    *inner = Value::String(REDACTED.to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
