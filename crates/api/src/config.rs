use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except secrets have sensible defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Streaming endpoints
    /// sit outside this layer.
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Secret for anti-forgery token verification on mutating endpoints.
    pub csrf_secret: String,
    /// Streaming delivery loop knobs.
    pub stream: StreamConfig,
    /// TTL for the per-process preference cache.
    pub pref_cache_ttl: Duration,
    /// TTL for the per-process identity mapping cache.
    pub identity_cache_ttl: Duration,
    /// Whether a failed preference lookup allows delivery (fail open) or
    /// denies it (fail closed).
    pub prefs_fail_open: bool,
}

/// Knobs for the per-connection streaming loops.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Pause between storage polls.
    pub poll_interval: Duration,
    /// Maximum fan-out rows fetched per poll.
    pub batch_size: i64,
    /// Wall-clock budget per connection before the server sends `bye` and
    /// forces a reconnect.
    pub budget: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `HOST`                    | `0.0.0.0`               |
    /// | `PORT`                    | `3000`                  |
    /// | `CORS_ORIGINS`            | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `CSRF_SECRET`             | **required**            |
    /// | `STREAM_POLL_INTERVAL_MS` | `2000`                  |
    /// | `STREAM_BATCH_SIZE`       | `50`                    |
    /// | `STREAM_BUDGET_SECS`      | `120`                   |
    /// | `PREF_CACHE_TTL_SECS`     | `30`                    |
    /// | `IDENTITY_CACHE_TTL_SECS` | `300`                   |
    /// | `PREFS_FAIL_OPEN`         | `true`                  |
    ///
    /// # Panics
    ///
    /// Panics if a secret is missing or a value fails to parse -- we want
    /// misconfiguration to fail fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_parsed("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let csrf_secret =
            std::env::var("CSRF_SECRET").expect("CSRF_SECRET must be set in the environment");
        assert!(!csrf_secret.is_empty(), "CSRF_SECRET must not be empty");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", 30),
            jwt: JwtConfig::from_env(),
            csrf_secret,
            stream: StreamConfig {
                poll_interval: Duration::from_millis(env_parsed("STREAM_POLL_INTERVAL_MS", 2000)),
                batch_size: env_parsed("STREAM_BATCH_SIZE", 50),
                budget: Duration::from_secs(env_parsed("STREAM_BUDGET_SECS", 120)),
            },
            pref_cache_ttl: Duration::from_secs(env_parsed("PREF_CACHE_TTL_SECS", 30)),
            identity_cache_ttl: Duration::from_secs(env_parsed("IDENTITY_CACHE_TTL_SECS", 300)),
            prefs_fail_open: env_parsed("PREFS_FAIL_OPEN", true),
        }
    }
}

/// Read an env var and parse it, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
fn env_parsed<T>(var: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Debug,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{var} must be a valid value: {e:?}")),
        Err(_) => default,
    }
}
