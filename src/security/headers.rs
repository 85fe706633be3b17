//! Security response headers.
//!
//! # Responsibilities
//! - Apply a fixed security header set to every response
//!
//! # Design Decisions
//! - Header values come from configuration, validated once at construction
//! - Applied by the dispatcher after routing, so 403/429/404/500 carry them too
//! - Existing values are overwritten; origins cannot weaken the policy

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::HeaderMap;

use crate::config::SecurityConfig;

/// Validated security header set.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    /// Build the header set from config, skipping (and logging) invalid values.
    pub fn from_config(config: &SecurityConfig) -> Self {
        if !config.enable_headers {
            return Self::default();
        }

        let pairs = [
            ("x-frame-options", config.frame_options.as_str()),
            ("x-content-type-options", "nosniff"),
            ("x-xss-protection", "1; mode=block"),
            ("strict-transport-security", config.strict_transport_security.as_str()),
            ("referrer-policy", config.referrer_policy.as_str()),
            ("content-security-policy", config.content_security_policy.as_str()),
            ("permissions-policy", config.permissions_policy.as_str()),
        ];

        let headers = pairs
            .into_iter()
            .filter_map(|(name, value)| match HeaderValue::from_str(value) {
                Ok(value) => Some((HeaderName::from_static(name), value)),
                Err(_) => {
                    tracing::warn!(header = name, "Invalid security header value, skipping");
                    None
                }
            })
            .collect();

        Self { headers }
    }

    /// Overwrite the security headers on `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
