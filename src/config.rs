use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Redis connection URL. Recommendation caching is disabled when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a login session in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,

    /// How long computed recommendations stay cached, in seconds
    #[serde(default = "default_recommendation_cache_ttl_secs")]
    pub recommendation_cache_ttl_secs: u64,

    /// Requests allowed per client per hour
    #[serde(default = "default_rate_limit_per_hour")]
    pub rate_limit_per_hour: u32,

    /// Requests allowed per client per day
    #[serde(default = "default_rate_limit_per_day")]
    pub rate_limit_per_day: u32,

    /// Registrations allowed per client per hour
    #[serde(default = "default_register_limit_per_hour")]
    pub register_limit_per_hour: u32,

    /// Insert sample books when the catalog is empty
    #[serde(default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
}

fn default_database_url() -> String {
    "sqlite://books.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_session_ttl_secs() -> i64 {
    3600
}

fn default_recommendation_cache_ttl_secs() -> u64 {
    300
}

fn default_rate_limit_per_hour() -> u32 {
    50
}

fn default_rate_limit_per_day() -> u32 {
    200
}

fn default_register_limit_per_hour() -> u32 {
    5
}

fn default_seed_sample_data() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            redis_url: None,
            host: default_host(),
            port: default_port(),
            session_ttl_secs: default_session_ttl_secs(),
            recommendation_cache_ttl_secs: default_recommendation_cache_ttl_secs(),
            rate_limit_per_hour: default_rate_limit_per_hour(),
            rate_limit_per_day: default_rate_limit_per_day(),
            register_limit_per_hour: default_register_limit_per_hour(),
            seed_sample_data: default_seed_sample_data(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.database_url, "sqlite://books.db");
        assert_eq!(config.redis_url, None);
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit_per_hour, 50);
        assert_eq!(config.rate_limit_per_day, 200);
        assert_eq!(config.register_limit_per_hour, 5);
        assert!(config.seed_sample_data);
    }

    #[test]
    fn test_overrides_from_environment() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
            ("REDIS_URL".to_string(), "redis://cache:6379".to_string()),
            ("PORT".to_string(), "8080".to_string()),
            ("SEED_SAMPLE_DATA".to_string(), "false".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert!(!config.seed_sample_data);
    }
}
