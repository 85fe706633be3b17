//! Request identity: correlation IDs and client addressing.
//!
//! # Responsibilities
//! - Read or assign the `X-Request-ID` correlation header
//! - Derive the client identity the rate limiter and country filter key on
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Forwarded-address headers count only when the socket peer is a trusted proxy
//! - From a trusted proxy, CDN headers win over proxy chains, which win over the socket

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, HeaderValue};

pub const X_REQUEST_ID: &str = "x-request-id";
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const CF_IPCOUNTRY: &str = "cf-ipcountry";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// The request's correlation ID, if the client or an outer layer set one.
pub fn request_id_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Return the request's correlation ID, assigning a UUID v4 when absent.
pub fn ensure_request_id(headers: &mut HeaderMap) -> String {
    if let Some(id) = request_id_of(headers) {
        return id;
    }
    let id = uuid::Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(X_REQUEST_ID, value);
    }
    id
}

/// Who sent the request, as far as the edge can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Client address; `"unknown"` when nothing identifies the client.
    pub ip: String,
    /// Two-letter country code reported by the CDN, upper-cased.
    pub country: Option<String>,
}

impl ClientIdentity {
    /// Identify the client behind `peer`.
    ///
    /// Forwarded-address headers are read only when `peer` is one of
    /// `trusted_proxies`; anyone else could set them to dodge the limiter.
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_proxies: &[IpAddr]) -> Self {
        let peer_ip = peer.map(|addr| addr.ip());
        let forwarded = match peer_ip {
            Some(ip) if trusted_proxies.contains(&ip) => forwarded_client(headers),
            _ => None,
        };
        let ip = forwarded
            .map(str::to_string)
            .or_else(|| peer_ip.map(|ip| ip.to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        let country = header_str(headers, CF_IPCOUNTRY).map(|c| c.to_ascii_uppercase());

        Self { ip, country }
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, CF_CONNECTING_IP)
        .or_else(|| {
            header_str(headers, X_FORWARDED_FOR)
                .and_then(|chain| chain.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .or_else(|| header_str(headers, X_REAL_IP))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn test_request_id() {
        let mut h = headers(&[(X_REQUEST_ID, "abc-123")]);
        assert_eq!(request_id_of(&h).as_deref(), Some("abc-123"));
        assert_eq!(ensure_request_id(&mut h), "abc-123");

        let mut empty = HeaderMap::new();
        let assigned = ensure_request_id(&mut empty);
        assert_eq!(assigned.len(), 36);
        assert_eq!(empty[X_REQUEST_ID], assigned.as_str());
        assert_eq!(ensure_request_id(&mut empty), assigned);
    }

    #[test]
    fn test_client_precedence_behind_trusted_proxy() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let trusted = ["10.0.0.9".parse::<IpAddr>().unwrap()];

        let all = headers(&[
            (CF_CONNECTING_IP, "1.1.1.1"),
            (X_FORWARDED_FOR, "2.2.2.2, 10.0.0.1"),
            (X_REAL_IP, "3.3.3.3"),
        ]);
        assert_eq!(ClientIdentity::from_headers(&all, Some(peer), &trusted).ip, "1.1.1.1");

        let chain = headers(&[(X_FORWARDED_FOR, " 2.2.2.2 , 10.0.0.1"), (X_REAL_IP, "3.3.3.3")]);
        assert_eq!(ClientIdentity::from_headers(&chain, Some(peer), &trusted).ip, "2.2.2.2");

        let real = headers(&[(X_REAL_IP, "3.3.3.3")]);
        assert_eq!(ClientIdentity::from_headers(&real, Some(peer), &trusted).ip, "3.3.3.3");

        assert_eq!(ClientIdentity::from_headers(&HeaderMap::new(), Some(peer), &trusted).ip, "10.0.0.9");
    }

    #[test]
    fn test_untrusted_peer_keyed_on_socket() {
        let peer: SocketAddr = "203.0.113.7:40000".parse().unwrap();
        let all = headers(&[
            (CF_CONNECTING_IP, "1.1.1.1"),
            (X_FORWARDED_FOR, "2.2.2.2"),
            (X_REAL_IP, "3.3.3.3"),
        ]);
        assert_eq!(ClientIdentity::from_headers(&all, Some(peer), &[]).ip, "203.0.113.7");

        let other_proxy = ["10.0.0.1".parse::<IpAddr>().unwrap()];
        assert_eq!(ClientIdentity::from_headers(&all, Some(peer), &other_proxy).ip, "203.0.113.7");

        assert_eq!(ClientIdentity::from_headers(&all, None, &other_proxy).ip, "unknown");
    }

    #[test]
    fn test_country() {
        let h = headers(&[(CF_IPCOUNTRY, "kp")]);
        assert_eq!(ClientIdentity::from_headers(&h, None, &[]).country.as_deref(), Some("KP"));
        assert_eq!(ClientIdentity::from_headers(&HeaderMap::new(), None, &[]).country, None);
    }
}
