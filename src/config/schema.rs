//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! dispatcher. All types derive Serde traits for deserialization from config files.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the edge dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Origin (backend API and static site) settings.
    pub origin: OriginConfig,

    /// Edge cache settings.
    pub cache: CacheConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Security headers and deny-lists.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed per request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL of the API backend; `/api/*` is proxied here.
    pub backend_url: String,

    /// Base URL of the static site origin.
    pub static_url: String,

    /// Origin fetch deadline in seconds.
    pub timeout_secs: u64,

    /// Region reported in `X-Edge-Region`.
    pub region: String,
}

impl OriginConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            backend_url: "https://api.hackerhardware.net".to_string(),
            static_url: "https://hackerhardware.net".to_string(),
            timeout_secs: 10,
            region: "unknown".to_string(),
        }
    }
}

/// Edge cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Default freshness lifetime in seconds.
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests admitted per client per window.
    pub threshold: u64,

    /// Counter lifetime in seconds; also the `Retry-After` hint.
    pub window_secs: u64,

    /// Admit requests when the counter store is unbound or failing.
    pub fail_open: bool,

    /// Paths that bypass the limiter (health probes).
    pub exempt_paths: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 100,
            window_secs: 60,
            fail_open: true,
            exempt_paths: vec!["/healthz".to_string(), "/edge/healthz".to_string()],
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,

    /// Country codes (`CF-IPCountry`) answered with 403.
    pub blocked_countries: Vec<String>,

    /// Peers whose `CF-Connecting-IP`/`X-Forwarded-For`/`X-Real-IP` are
    /// believed. Every other client is keyed on its socket address.
    pub trusted_proxies: Vec<IpAddr>,

    /// Maximum buffered request body size in bytes.
    pub max_body_size: usize,

    pub frame_options: String,
    pub strict_transport_security: String,
    pub referrer_policy: String,
    pub content_security_policy: String,
    pub permissions_policy: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            blocked_countries: Vec::new(),
            trusted_proxies: Vec::new(),
            max_body_size: 2 * 1024 * 1024, // 2MB
            frame_options: "DENY".to_string(),
            strict_transport_security: "max-age=31536000; includeSubDomains".to_string(),
            referrer_policy: "strict-origin-when-cross-origin".to_string(),
            content_security_policy: "default-src 'self'".to_string(),
            permissions_policy: "geolocation=(), microphone=(), camera=()".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: EdgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, EdgeConfig::default());
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.rate_limit.threshold, 100);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(config.rate_limit.fail_open);
        assert_eq!(config.origin.timeout(), Duration::from_secs(10));
        assert!(config.security.blocked_countries.is_empty());
        assert!(config.security.trusted_proxies.is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let config: EdgeConfig = toml::from_str(
            r#"
            [origin]
            backend_url = "http://127.0.0.1:3000"

            [rate_limit]
            threshold = 5
            fail_open = false

            [security]
            blocked_countries = ["XX"]
            trusted_proxies = ["10.0.0.1", "::1"]

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.origin.backend_url, "http://127.0.0.1:3000");
        assert_eq!(config.origin.timeout_secs, 10);
        assert_eq!(config.rate_limit.threshold, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(!config.rate_limit.fail_open);
        assert_eq!(config.security.blocked_countries, vec!["XX".to_string()]);
        assert_eq!(
            config.security.trusted_proxies,
            vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
