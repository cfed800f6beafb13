use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redis connection URL. The in-memory cache is used when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Goodreads user whose shelves are read
    #[serde(default = "default_goodreads_user_id")]
    pub goodreads_user_id: String,

    /// Number of RSS pages fetched per shelf
    #[serde(default = "default_goodreads_pages")]
    pub goodreads_pages: u32,

    /// Anthropic API key. Recommendations fall back to shelf order when unset.
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic Messages API URL
    #[serde(default = "default_anthropic_api_url")]
    pub anthropic_api_url: String,

    /// Model used for ranking
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// Catalog search page
    #[serde(default = "default_catalog_search_url")]
    pub catalog_search_url: String,

    /// Origin prepended to root-relative record links
    #[serde(default = "default_catalog_origin")]
    pub catalog_origin: String,

    /// Base of the per-record availability endpoint
    #[serde(default = "default_availability_api_url")]
    pub availability_api_url: String,

    /// Library name shown in verdict details
    #[serde(default = "default_library_name")]
    pub library_name: String,

    /// Branch given priority in availability details
    #[serde(default = "default_preferred_branch")]
    pub preferred_branch: String,

    /// Per-request timeout for every outbound call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Minimum pause between successive catalog lookups in a batch
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// How long a fresh recommendation list stays cached
    #[serde(default = "default_recommendation_cache_ttl_secs")]
    pub recommendation_cache_ttl_secs: u64,

    /// Directory holding the saved book list
    #[serde(default = "default_saved_list_dir")]
    pub saved_list_dir: String,

    /// Comma-separated CORS origins. `*` matches any run of characters.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_goodreads_user_id() -> String {
    "219870".to_string()
}

fn default_goodreads_pages() -> u32 {
    3
}

fn default_anthropic_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_anthropic_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_catalog_search_url() -> String {
    "https://sfpl.bibliocommons.com/v2/search".to_string()
}

fn default_catalog_origin() -> String {
    "https://sfpl.bibliocommons.com".to_string()
}

fn default_availability_api_url() -> String {
    "https://gateway.bibliocommons.com/v2/libraries/sfpl/bibs".to_string()
}

fn default_library_name() -> String {
    "SFPL".to_string()
}

fn default_preferred_branch() -> String {
    "PARK BRANCH".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_batch_delay_ms() -> u64 {
    500
}

fn default_recommendation_cache_ttl_secs() -> u64 {
    3600
}

fn default_saved_list_dir() -> String {
    "data".to_string()
}

fn default_cors_origins() -> String {
    "https://geoff.lovable.app,https://*.lovableproject.com,https://*.lovable.dev,https://*.lovable.app"
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            redis_url: None,
            goodreads_user_id: default_goodreads_user_id(),
            goodreads_pages: default_goodreads_pages(),
            anthropic_api_key: None,
            anthropic_api_url: default_anthropic_api_url(),
            anthropic_model: default_anthropic_model(),
            catalog_search_url: default_catalog_search_url(),
            catalog_origin: default_catalog_origin(),
            availability_api_url: default_availability_api_url(),
            library_name: default_library_name(),
            preferred_branch: default_preferred_branch(),
            request_timeout_secs: default_request_timeout_secs(),
            batch_delay_ms: default_batch_delay_ms(),
            recommendation_cache_ttl_secs: default_recommendation_cache_ttl_secs(),
            saved_list_dir: default_saved_list_dir(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Anthropic key, ignoring empty values and unedited `your-...` placeholders
    pub fn usable_anthropic_key(&self) -> Option<&str> {
        self.anthropic_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with("your-"))
    }

    /// Parsed CORS origin patterns
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        let default = Config::default();

        assert_eq!(config.port, default.port);
        assert_eq!(config.preferred_branch, "PARK BRANCH");
        assert_eq!(config.batch_delay_ms, 500);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.catalog_origin, default.catalog_origin);
    }

    #[test]
    fn test_environment_overrides() {
        let config: Config = envy::from_iter(vec![
            ("PREFERRED_BRANCH".to_string(), "MISSION BRANCH".to_string()),
            ("BATCH_DELAY_MS".to_string(), "0".to_string()),
            ("REDIS_URL".to_string(), "redis://cache:6379".to_string()),
        ])
        .unwrap();

        assert_eq!(config.preferred_branch, "MISSION BRANCH");
        assert_eq!(config.batch_delay_ms, 0);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
    }

    #[test]
    fn test_placeholder_api_key_is_ignored() {
        let mut config = Config::default();
        assert_eq!(config.usable_anthropic_key(), None);

        config.anthropic_api_key = Some("your-api-key-here".to_string());
        assert_eq!(config.usable_anthropic_key(), None);

        config.anthropic_api_key = Some("sk-ant-123".to_string());
        assert_eq!(config.usable_anthropic_key(), Some("sk-ant-123"));
    }

    #[test]
    fn test_cors_origin_list() {
        let config = Config {
            cors_origins: "https://a.app, https://*.b.dev,,".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.cors_origin_list(),
            vec!["https://a.app".to_string(), "https://*.b.dev".to_string()]
        );
    }
}
