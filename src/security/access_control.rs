//! Country deny-list.
//!
//! Blocks requests whose edge-reported country (`CF-IPCountry`) appears in
//! `security.blocked_countries`. The list is empty by default, so nothing is
//! blocked unless configured.

use std::collections::HashSet;

use crate::config::SecurityConfig;

/// Set of blocked ISO 3166-1 alpha-2 country codes.
#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    blocked: HashSet<String>,
}

impl CountryFilter {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocked: codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.blocked_countries)
    }

    /// True when `country` is on the deny-list. Unknown countries pass.
    pub fn is_blocked(&self, country: Option<&str>) -> bool {
        match country {
            Some(code) => self.blocked.contains(&code.trim().to_ascii_uppercase()),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}
