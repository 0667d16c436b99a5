use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_GENERATOR_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GENERATOR_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub introspection_url: String,
    /// Authorization server advertised in the protected-resource metadata
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Process configuration read from the environment
///
/// A zero cache capacity or an unparseable value is a startup failure.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cache_capacity: usize,
    /// `key=identity[:display name]` entries separated by commas
    pub api_keys: String,
    pub oauth: Option<OAuthConfig>,
    pub generator: GeneratorConfig,
    pub assets_dir: PathBuf,
    pub base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = parse_var("BIND_ADDR", DEFAULT_BIND_ADDR)?;

        let cache_capacity: usize =
            parse_var("INSTANCE_CACHE_CAPACITY", &DEFAULT_CACHE_CAPACITY.to_string())?;
        validate_capacity(cache_capacity)?;

        let oauth = non_empty_var("OAUTH_INTROSPECTION_URL").map(|introspection_url| OAuthConfig {
            introspection_url,
            issuer: non_empty_var("OAUTH_ISSUER"),
            client_id: non_empty_var("OAUTH_CLIENT_ID"),
            client_secret: non_empty_var("OAUTH_CLIENT_SECRET"),
        });

        let timeout_secs: u64 = parse_var(
            "GENERATOR_TIMEOUT_SECS",
            &DEFAULT_GENERATOR_TIMEOUT_SECS.to_string(),
        )?;

        let generator = GeneratorConfig {
            base_url: non_empty_var("GENERATOR_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GENERATOR_BASE_URL.to_string()),
            api_key: non_empty_var("GENERATOR_API_KEY"),
            model: non_empty_var("GENERATOR_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATOR_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        let bind_display = bind_addr_display(&bind_addr);

        Ok(Self {
            bind_addr,
            cache_capacity,
            api_keys: env::var("API_KEYS").unwrap_or_default(),
            oauth,
            generator,
            assets_dir: non_empty_var("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./assets")),
            base_url: non_empty_var("BASE_URL")
                .unwrap_or_else(|| format!("http://{}", bind_display)),
        })
    }

    /// Applies command-line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        bind_addr: Option<SocketAddr>,
        cache_capacity: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(addr) = bind_addr {
            self.bind_addr = addr;
        }
        if let Some(capacity) = cache_capacity {
            validate_capacity(capacity)?;
            self.cache_capacity = capacity;
        }
        Ok(self)
    }
}

fn validate_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::InvalidCapacity(capacity));
    }
    Ok(())
}

fn bind_addr_display(addr: &SocketAddr) -> String {
    if addr.ip().is_unspecified() || addr.ip().is_loopback() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = non_empty_var(name).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue { name, value: raw })
}
