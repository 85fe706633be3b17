//! Route template compilation and path matching.
//!
//! # Responsibilities
//! - Compile `/literal/:param` templates into anchored matchers
//! - Extract named parameters from matching paths
//! - Reject malformed templates at configuration time
//!
//! # Design Decisions
//! - Whole-path anchoring: partial matches never succeed
//! - A parameter captures one or more non-`/` characters, so empty segments fail
//! - Literal text is escaped, `.` in `/feed.json` is not a wildcard
//! - A trailing `*name` captures the rest of the path (may contain `/`)
//! - Compiled once at startup; matching is pure

use std::collections::HashMap;

use regex::Regex;

/// Errors raised while compiling a route template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// The same parameter name appears twice.
    #[error("duplicate parameter '{name}' in template '{template}'")]
    DuplicateParameter { template: String, name: String },

    /// A `*name` splat appears before the end of the template.
    #[error("splat parameter must be the last token in template '{0}'")]
    MisplacedSplat(String),

    /// The generated expression was rejected (e.g. a name starting with a digit).
    #[error("template '{template}' does not compile: {reason}")]
    Invalid { template: String, reason: String },
}

/// Path parameters captured by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    /// Get a captured value by parameter name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl CompiledPattern {
    /// Compile a route template.
    ///
    /// `:name` (word characters) becomes a single-segment capture, a final
    /// `*name` captures the remainder. Any other character, including a bare
    /// `:` or `*`, is matched literally.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let mut source = String::with_capacity(template.len() * 2);
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        source.push('^');
        while let Some((idx, ch)) = chars.next() {
            let is_token = (ch == ':' || ch == '*')
                && chars.peek().is_some_and(|(_, next)| is_word(*next));
            if !is_token {
                literal.push(ch);
                continue;
            }

            let mut name = String::new();
            while let Some((_, next)) = chars.peek() {
                if !is_word(*next) {
                    break;
                }
                name.push(*next);
                chars.next();
            }

            if names.contains(&name) {
                return Err(PatternError::DuplicateParameter {
                    template: template.to_string(),
                    name,
                });
            }

            source.push_str(&regex::escape(&literal));
            literal.clear();

            if ch == '*' {
                if idx + 1 + name.len() != template.len() {
                    return Err(PatternError::MisplacedSplat(template.to_string()));
                }
                source.push_str(&format!("(?P<{name}>.+)"));
            } else {
                source.push_str(&format!("(?P<{name}>[^/]+)"));
            }
            names.push(name);
        }
        source.push_str(&regex::escape(&literal));
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| PatternError::Invalid {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    /// Match a request path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let mut params = PathParams::new();
        for name in &self.names {
            if let Some(value) = captures.name(name) {
                params.insert(name.clone(), value.as_str());
            }
        }
        Some(params)
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in template order.
    pub fn param_names(&self) -> &[String] {
        &self.names
    }
}

fn is_word(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_template() {
        let pattern = CompiledPattern::compile("/healthz").unwrap();
        assert!(pattern.matches("/healthz").unwrap().is_empty());
        assert!(pattern.matches("/healthz/").is_none());
        assert!(pattern.matches("/edge/healthz").is_none());
        assert!(pattern.matches("/healthzz").is_none());
    }

    #[test]
    fn test_single_param() {
        let pattern = CompiledPattern::compile("/api/users/:id").unwrap();
        let params = pattern.matches("/api/users/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_consecutive_params_stop_at_separator() {
        let pattern = CompiledPattern::compile("/:a/:b").unwrap();
        let params = pattern.matches("/left/right").unwrap();
        assert_eq!(params.get("a"), Some("left"));
        assert_eq!(params.get("b"), Some("right"));
        assert!(pattern.matches("/only").is_none());
        assert!(pattern.matches("/a/b/c").is_none());
    }

    #[test]
    fn test_empty_segment_rejected() {
        let pattern = CompiledPattern::compile("/api/users/:id").unwrap();
        assert!(pattern.matches("/api/users/").is_none());

        let pattern = CompiledPattern::compile("/:a/:b").unwrap();
        assert!(pattern.matches("//right").is_none());
    }

    #[test]
    fn test_literal_mismatch() {
        let pattern = CompiledPattern::compile("/api/users/:id").unwrap();
        assert!(pattern.matches("/api/posts/42").is_none());
        // Anchored at both ends
        assert!(pattern.matches("/v2/api/users/42").is_none());
        assert!(pattern.matches("/api/users/42/posts").is_none());
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let pattern = CompiledPattern::compile("/feed.json").unwrap();
        assert!(pattern.matches("/feed.json").is_some());
        assert!(pattern.matches("/feedxjson").is_none());
    }

    #[test]
    fn test_param_inside_segment() {
        let pattern = CompiledPattern::compile("/files/:name.txt").unwrap();
        let params = pattern.matches("/files/readme.txt").unwrap();
        assert_eq!(params.get("name"), Some("readme"));
    }

    #[test]
    fn test_bare_colon_is_literal() {
        let pattern = CompiledPattern::compile("/time/12:/x").unwrap();
        assert!(pattern.matches("/time/12:/x").is_some());
        assert!(pattern.param_names().is_empty());
    }

    #[test]
    fn test_splat_captures_remainder() {
        let pattern = CompiledPattern::compile("/static/*path").unwrap();
        let params = pattern.matches("/static/css/site.css").unwrap();
        assert_eq!(params.get("path"), Some("css/site.css"));
        assert!(pattern.matches("/static/").is_none());
        assert!(pattern.matches("/assets/app.js").is_none());
    }

    #[test]
    fn test_misplaced_splat() {
        let err = CompiledPattern::compile("/*rest/tail").unwrap_err();
        assert!(matches!(err, PatternError::MisplacedSplat(_)));
    }

    #[test]
    fn test_duplicate_param() {
        let err = CompiledPattern::compile("/:id/:id").unwrap_err();
        assert_eq!(
            err,
            PatternError::DuplicateParameter {
                template: "/:id/:id".into(),
                name: "id".into(),
            }
        );
    }

    #[test]
    fn test_numeric_name_is_invalid() {
        let err = CompiledPattern::compile("/:1st").unwrap_err();
        assert!(matches!(err, PatternError::Invalid { .. }));
    }

    #[test]
    fn test_recompile_same_behavior() {
        let a = CompiledPattern::compile("/api/:kind/:id").unwrap();
        let b = CompiledPattern::compile("/api/:kind/:id").unwrap();
        for path in ["/api/x/1", "/api/x", "/api//1", "/api/x/1/2", "/other/x/1"] {
            assert_eq!(a.matches(path), b.matches(path), "path {path}");
        }
    }
}
