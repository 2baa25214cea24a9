// Transparent request forwarding to a backend service
//
// Method, path, query, headers and body go out unchanged (minus hop-by-hop
// headers); status, headers and body come back unchanged. The caller's Host
// header is kept. Bodies are streamed in both directions.

use std::net::IpAddr;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Uri, Version},
    response::Response,
};
use hyper::body::Incoming;

use crate::app_state::AppState;
use crate::config::{Backend, BackendTarget};
use crate::error::GatewayError;

/// Headers that describe a single connection and must not be relayed
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

// ============================================================================
// URL RESOLUTION
// ============================================================================

impl BackendTarget {
    /// Resolve the outbound URI for an inbound request URI.
    ///
    /// The base URL is parsed here, on every call. The inbound path is appended
    /// to the base path byte for byte: never stripped, never decoded, and dot
    /// segments (`..`, `%2e`) are not resolved. Queries are concatenated.
    pub fn uri_for(&self, uri: &Uri) -> Result<Uri, GatewayError> {
        let invalid = || GatewayError::InvalidServiceUrl {
            backend: self.name,
            url: self.base_url.clone(),
        };

        let base: Uri = self.base_url.trim().parse().map_err(|_| invalid())?;
        let scheme = base
            .scheme_str()
            .filter(|scheme| matches!(*scheme, "http" | "https"))
            .ok_or_else(invalid)?;
        let authority = base
            .authority()
            .filter(|authority| !authority.host().is_empty())
            .ok_or_else(invalid)?;

        let path = join_paths(base.path(), uri.path());
        let target = match join_queries(base.query(), uri.query()) {
            Some(query) => format!("{}://{}{}?{}", scheme, authority, path, query),
            None => format!("{}://{}{}", scheme, authority, path),
        };
        target.parse().map_err(|_| invalid())
    }
}

/// Join two paths with exactly one slash between them
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn join_queries(base: Option<&str>, query: Option<&str>) -> Option<String> {
    match (base.filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
        (Some(base), Some(query)) => Some(format!("{}&{}", base, query)),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

// ============================================================================
// HEADERS
// ============================================================================

/// Remove hop-by-hop headers, including any header listed in `Connection`
pub fn strip_hop_headers(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Append the caller's address to `X-Forwarded-For`, keeping prior hops
pub fn append_forwarded_for(headers: &mut HeaderMap, client_ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    let value = if prior.is_empty() {
        client_ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), client_ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

// ============================================================================
// FORWARDING
// ============================================================================

/// Forward `request` to `backend` and relay its response.
///
/// No retries. Transport failures and the response-header timeout are mapped
/// to `GatewayError`; any status the backend returns is relayed as-is.
pub async fn forward(
    state: &AppState,
    backend: Backend,
    client_ip: Option<IpAddr>,
    request: Request,
) -> Result<Response, GatewayError> {
    let target = state.config.target(backend);
    let uri = target.uri_for(request.uri())?;

    let (mut parts, body) = request.into_parts();
    strip_hop_headers(&mut parts.headers);
    if let Some(ip) = client_ip {
        append_forwarded_for(&mut parts.headers, ip);
    }
    parts.uri = uri;
    // Backends are spoken to over HTTP/1.1 whatever the caller used
    parts.version = Version::HTTP_11;
    parts.extensions.clear();

    tracing::debug!(backend = target.name, method = %parts.method, uri = %parts.uri, "forwarding request");

    let send = state.client.request(Request::from_parts(parts, body));
    let result = match state.config.upstream_timeout {
        Some(limit) => tokio::time::timeout(limit, send)
            .await
            .map_err(|_| GatewayError::UpstreamTimeout { backend: target.name })?,
        None => send.await,
    };
    let upstream = result.map_err(|e| GatewayError::from_upstream(target.name, &e))?;

    Ok(relay_response(upstream))
}

fn relay_response(upstream: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = upstream.into_parts();
    strip_hop_headers(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(base_url: &str) -> BackendTarget {
        BackendTarget {
            name: "app",
            base_url: base_url.to_string(),
        }
    }

    fn resolve(base_url: &str, uri: &str) -> Result<String, GatewayError> {
        let uri: Uri = uri.parse().unwrap();
        target(base_url).uri_for(&uri).map(|uri| uri.to_string())
    }

    #[test]
    fn path_is_forwarded_without_stripping() {
        assert_eq!(
            resolve("http://localhost:3001", "/api/auth/login").unwrap(),
            "http://localhost:3001/api/auth/login"
        );
        assert_eq!(
            resolve("https://auth.example.com", "/api/auth/refresh").unwrap(),
            "https://auth.example.com/api/auth/refresh"
        );
    }

    #[test]
    fn id_segment_passes_through_untouched() {
        assert_eq!(
            resolve("http://localhost:3002", "/api/images/abc-123/status").unwrap(),
            "http://localhost:3002/api/images/abc-123/status"
        );
        assert_eq!(
            resolve("http://localhost:3002", "/api/images/a%2Fb").unwrap(),
            "http://localhost:3002/api/images/a%2Fb"
        );
    }

    #[test]
    fn dot_segments_are_not_resolved() {
        for path in [
            "/api/images/%2e%2e/status",
            "/api/images/%2E",
            "/api/images/..",
            "/api/images/../status",
            "/api/images/./x",
        ] {
            assert_eq!(
                resolve("http://localhost:3002", path).unwrap(),
                format!("http://localhost:3002{}", path)
            );
        }
        assert_eq!(
            resolve("http://app:3002/v2", "/../admin").unwrap(),
            "http://app:3002/v2/../admin"
        );
    }

    #[test]
    fn base_path_and_queries_are_joined() {
        assert_eq!(
            resolve("http://app:3002/prefix", "/api/images?page=2").unwrap(),
            "http://app:3002/prefix/api/images?page=2"
        );
        assert_eq!(
            resolve("http://app:3002/prefix/", "/api/images").unwrap(),
            "http://app:3002/prefix/api/images"
        );
        assert_eq!(
            resolve("http://app:3002/?tenant=a", "/x?y=1").unwrap(),
            "http://app:3002/x?tenant=a&y=1"
        );
    }

    #[test]
    fn join_paths_inserts_a_single_slash() {
        assert_eq!(join_paths("/", "/a"), "/a");
        assert_eq!(join_paths("/base", "/a"), "/base/a");
        assert_eq!(join_paths("/base/", "a"), "/base/a");
        assert_eq!(join_paths("/base", "a"), "/base/a");
    }

    #[test]
    fn malformed_base_urls_are_rejected() {
        for bad in [
            "not a url",
            "localhost:3001",
            "mailto:ops@example.com",
            "ftp://files.local",
            "http://",
            "/just/a/path",
        ] {
            let err = resolve(bad, "/api/images").unwrap_err();
            assert!(
                matches!(err, GatewayError::InvalidServiceUrl { .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn hop_by_hop_headers_are_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, X-Session-Hop"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hop", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        strip_hop_headers(&mut headers);

        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-session-hop").is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers[header::AUTHORIZATION], "Bearer token");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn forwarded_for_appends_to_existing_chain() {
        let ip: IpAddr = "10.0.0.7".parse().unwrap();

        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, ip);
        assert_eq!(headers[X_FORWARDED_FOR], "10.0.0.7");

        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));
        append_forwarded_for(&mut headers, ip);
        assert_eq!(headers[X_FORWARDED_FOR], "203.0.113.9, 10.0.0.7");
    }
}
