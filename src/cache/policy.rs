//! Cacheability rules.

use std::time::Duration;

use axum::http::{header, HeaderMap, Method, StatusCode};

/// Whether a response to `method` may be cached at the edge.
///
/// Only successful GET/HEAD responses without `no-cache`, `no-store` or
/// `private` in `Cache-Control` qualify.
pub fn should_cache(method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
    if *method != Method::GET && *method != Method::HEAD {
        return false;
    }
    is_storable(status, headers)
}

/// Whether a response may sit in a cache shared between clients,
/// regardless of the method that produced it.
pub fn is_storable(status: StatusCode, headers: &HeaderMap) -> bool {
    status.is_success()
        && !cache_control_directives(headers)
            .any(|d| d == "no-cache" || d == "no-store" || d == "private")
}

/// Freshness lifetime from `Cache-Control: max-age`, else `default`.
pub fn ttl_from_headers(headers: &HeaderMap, default: Duration) -> Duration {
    cache_control_directives(headers)
        .find_map(|d| d.strip_prefix("max-age=")?.trim_matches('"').parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn cache_control_directives(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|d| d.trim().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cache_control: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::CACHE_CONTROL, HeaderValue::from_str(cache_control).unwrap());
        h
    }

    #[test]
    fn test_methods() {
        let h = HeaderMap::new();
        assert!(should_cache(&Method::GET, StatusCode::OK, &h));
        assert!(should_cache(&Method::HEAD, StatusCode::OK, &h));
        assert!(!should_cache(&Method::POST, StatusCode::OK, &h));
        assert!(!should_cache(&Method::DELETE, StatusCode::OK, &h));
    }

    #[test]
    fn test_unsuccessful_not_cached() {
        let h = HeaderMap::new();
        assert!(!should_cache(&Method::GET, StatusCode::NOT_FOUND, &h));
        assert!(!should_cache(&Method::GET, StatusCode::SERVICE_UNAVAILABLE, &h));
        assert!(!should_cache(&Method::GET, StatusCode::MOVED_PERMANENTLY, &h));
    }

    #[test]
    fn test_cache_control_directives() {
        assert!(!should_cache(&Method::GET, StatusCode::OK, &headers("no-store")));
        assert!(!should_cache(&Method::GET, StatusCode::OK, &headers("private, max-age=60")));
        assert!(!should_cache(&Method::GET, StatusCode::OK, &headers("public, No-Cache")));
        assert!(should_cache(&Method::GET, StatusCode::OK, &headers("public, max-age=60")));
    }

    #[test]
    fn test_storable_ignores_method() {
        assert!(is_storable(StatusCode::OK, &HeaderMap::new()));
        assert!(!is_storable(StatusCode::OK, &headers("private, no-store")));
        assert!(!is_storable(StatusCode::NO_CONTENT, &headers("no-cache")));
        assert!(!is_storable(StatusCode::BAD_GATEWAY, &HeaderMap::new()));
    }

    #[test]
    fn test_ttl_from_headers() {
        let default = Duration::from_secs(300);
        assert_eq!(ttl_from_headers(&headers("public, max-age=60"), default), Duration::from_secs(60));
        assert_eq!(ttl_from_headers(&headers("no-cache"), default), default);
        assert_eq!(ttl_from_headers(&headers("max-age=abc"), default), default);
        assert_eq!(ttl_from_headers(&HeaderMap::new(), default), default);
    }
}
