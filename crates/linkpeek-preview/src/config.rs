//! Service configuration loaded from environment variables.

use std::time::Duration;

/// Default overall fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default response body ceiling (5 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

/// Browser User-Agent sent with every fetch. Many sites block unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3001").
    pub bind_addr: String,

    /// Hard wall-clock limit for one destination fetch.
    pub fetch_timeout: Duration,

    /// Largest response body accepted from a destination.
    pub max_body_bytes: u64,

    /// User-Agent header sent to destinations.
    pub user_agent: String,

    /// Allow previews of loopback/private-network hosts.
    /// Off in production; handy when pointing at local test servers.
    pub allow_private_hosts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_hosts: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - None (all have defaults)
    ///
    /// Optional:
    /// - `PREVIEW_BIND_ADDR`: Server bind address (default: "0.0.0.0:3001")
    /// - `PREVIEW_FETCH_TIMEOUT_MS`: Fetch timeout in milliseconds (default: 10000)
    /// - `PREVIEW_MAX_BODY_BYTES`: Response size ceiling (default: 5242880)
    /// - `PREVIEW_USER_AGENT`: User-Agent for destination requests
    /// - `PREVIEW_ALLOW_PRIVATE_HOSTS`: "true"/"1" to allow private hosts (default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("PREVIEW_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let fetch_timeout = match std::env::var("PREVIEW_FETCH_TIMEOUT_MS") {
            Ok(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|e| {
                    anyhow::anyhow!("PREVIEW_FETCH_TIMEOUT_MS must be an integer: {e}")
                })?;
                if ms == 0 {
                    anyhow::bail!("PREVIEW_FETCH_TIMEOUT_MS must be greater than zero");
                }
                Duration::from_millis(ms)
            }
            Err(_) => defaults.fetch_timeout,
        };

        let max_body_bytes = match std::env::var("PREVIEW_MAX_BODY_BYTES") {
            Ok(raw) => raw.trim().parse().map_err(|e| {
                anyhow::anyhow!("PREVIEW_MAX_BODY_BYTES must be an integer: {e}")
            })?,
            Err(_) => defaults.max_body_bytes,
        };

        let user_agent = std::env::var("PREVIEW_USER_AGENT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.user_agent);

        let allow_private_hosts = std::env::var("PREVIEW_ALLOW_PRIVATE_HOSTS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        tracing::info!(
            bind_addr = %bind_addr,
            fetch_timeout_ms = fetch_timeout.as_millis() as u64,
            max_body_bytes,
            allow_private_hosts,
            "preview configuration loaded"
        );

        Ok(Self {
            bind_addr,
            fetch_timeout,
            max_body_bytes,
            user_agent,
            allow_private_hosts,
        })
    }
}
