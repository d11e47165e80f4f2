//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Rewrite an inbound request into one addressed to a backend
//! - Strip hop-by-hop headers, append X-Forwarded-For
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing, and forwarded
//! - Host header is preserved so backends see the app domain
//! - Upstream always spoken as HTTP/1.1

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue, CONNECTION};
use axum::http::{Request, Uri, Version};
use std::net::SocketAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::load_balancer::BackendId;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Produces a UUID v4 request ID for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID of a request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in named {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Rewrite `request` so it can be sent to `backend`.
pub fn upstream_request(
    request: Request<Body>,
    backend: &BackendId,
    client: Option<SocketAddr>,
) -> Result<Request<Body>, axum::http::Error> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = Uri::builder()
        .scheme("http")
        .authority(backend.to_string())
        .path_and_query(path_and_query)
        .build()?;

    parts.uri = uri;
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);

    if let Some(client) = client {
        let forwarded = match parts.headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{}, {}", prior, client.ip()),
            None => client.ip().to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method};

    #[test]
    fn test_upstream_request_rewrite() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/items?page=2")
            .header(header::HOST, "www.example.com")
            .header(header::CONNECTION, "keep-alive, x-private")
            .header("x-private", "drop me")
            .header("keep-alive", "timeout=5")
            .header(X_REQUEST_ID, "abc-123")
            .header(X_FORWARDED_FOR, "10.1.1.1")
            .body(Body::empty())
            .unwrap();

        let client: SocketAddr = "192.168.0.7:55000".parse().unwrap();
        let out = upstream_request(req, &BackendId::new("127.0.0.1", 9001), Some(client)).unwrap();

        assert_eq!(out.uri().to_string(), "http://127.0.0.1:9001/api/items?page=2");
        assert_eq!(out.version(), Version::HTTP_11);
        assert_eq!(out.headers()[header::HOST], "www.example.com");
        assert_eq!(out.headers()[X_REQUEST_ID], "abc-123");
        assert_eq!(out.headers()[X_FORWARDED_FOR], "10.1.1.1, 192.168.0.7");
        assert!(out.headers().get(header::CONNECTION).is_none());
        assert!(out.headers().get("keep-alive").is_none());
        assert!(out.headers().get("x-private").is_none());
    }

    #[test]
    fn test_request_id_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("r-1"));
        assert_eq!(request_id(&headers), "r-1");
    }

    #[test]
    fn test_uuid_request_id() {
        let req = Request::new(());
        let id = UuidRequestId.make_request_id(&req).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
