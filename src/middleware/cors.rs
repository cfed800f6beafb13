use axum::http::{HeaderValue, Method};
use regex::{Regex, RegexBuilder};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Compiles an origin pattern into an anchored, case-insensitive regex
///
/// `*` matches any run of characters, so `https://*.example.app` admits every
/// subdomain. A lone `*` admits everything.
pub fn compile_origin_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    RegexBuilder::new(&format!("^{}$", body))
        .case_insensitive(true)
        .build()
}

/// Compiles every configured pattern, skipping (and logging) any that fail
pub fn compile_origin_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match compile_origin_pattern(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Ignoring CORS origin pattern");
                None
            }
        })
        .collect()
}

pub fn origin_allowed(allowed: &[Regex], origin: &str) -> bool {
    allowed.iter().any(|regex| regex.is_match(origin))
}

/// Builds the CORS layer for the configured origin patterns
pub fn cors_layer(patterns: Vec<String>) -> CorsLayer {
    let allowed = compile_origin_patterns(&patterns);

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| {
                origin
                    .to_str()
                    .map(|origin| origin_allowed(&allowed, origin))
                    .unwrap_or(false)
            },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(values: &[&str]) -> Vec<Regex> {
        let patterns: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        compile_origin_patterns(&patterns)
    }

    #[test]
    fn test_exact_origin() {
        let allowed = allowed(&["http://localhost:5173"]);
        assert!(origin_allowed(&allowed, "http://localhost:5173"));
        assert!(!origin_allowed(&allowed, "http://localhost:3000"));
        assert!(!origin_allowed(&allowed, "http://localhost:51734"));
    }

    #[test]
    fn test_subdomain_wildcard() {
        let allowed = allowed(&["https://*.lovable.app"]);
        assert!(origin_allowed(&allowed, "https://my-shelf.lovable.app"));
        assert!(origin_allowed(&allowed, "HTTPS://My-Shelf.Lovable.App"));
        assert!(!origin_allowed(&allowed, "https://lovable.app.evil.com"));
        assert!(!origin_allowed(&allowed, "http://my-shelf.lovable.app"));
    }

    #[test]
    fn test_dots_are_literal() {
        let allowed = allowed(&["https://geoff.lovable.app"]);
        assert!(!origin_allowed(&allowed, "https://geoffxlovable.app"));
    }

    #[test]
    fn test_lone_star_allows_everything() {
        assert!(origin_allowed(&allowed(&["*"]), "https://anything.test"));
    }

    #[test]
    fn test_no_patterns_allows_nothing() {
        assert!(!origin_allowed(&[], "http://localhost:5173"));
    }

    #[test]
    fn test_compiled_pattern_is_anchored() {
        let regex = compile_origin_pattern("https://*.lovable.dev").unwrap();
        assert_eq!(regex.as_str(), r"^https://.*\.lovable\.dev$");
    }
}
