//! Service configuration with validation.
//!
//! Built once at start-up and handed to each component by value or `Arc`.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Admission control
    pub rate_limit: RateLimitConfig,
    /// List resource paging
    pub pagination: PaginationConfig,
    /// Gas-price aggregate windows
    pub gas_price: GasPriceConfig,
    /// Ledger Store connection
    pub database: DatabaseConfig,
    /// Counter Store connection
    pub counter: CounterConfig,
    /// Client IP resolution behind proxies
    pub security: SecurityConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl ApiConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidRateLimit("window cannot be 0".into()));
        }
        if self.rate_limit.limit == 0 {
            return Err(ConfigError::InvalidRateLimit("limit cannot be 0".into()));
        }

        if self.pagination.page_size == 0 {
            return Err(ConfigError::InvalidLimit("page_size cannot be 0".into()));
        }
        if self.http.max_body_size == 0 {
            return Err(ConfigError::InvalidLimit("max_body_size cannot be 0".into()));
        }

        let gas = &self.gas_price;
        if gas.max_window == 0 || gas.default_window == 0 || gas.default_window > gas.max_window {
            return Err(ConfigError::InvalidLimit(format!(
                "gas_price.default_window must be within 1..={}",
                gas.max_window
            )));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Connection string for the Ledger Store
    pub fn database_dsn(&self) -> Result<String, ConfigError> {
        self.database.dsn()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            max_body_size: 64 * 1024,
        }
    }
}

/// Fixed-window admission control
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable admission control
    pub enabled: bool,
    /// Window length
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Requests admitted per client per window
    pub limit: u64,
    /// Clients never throttled
    pub exempt: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(300),
            limit: 300,
            exempt: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows per page
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 500 }
    }
}

/// Block windows for the gas-price aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasPriceConfig {
    /// Window used when the request names none
    pub default_window: u64,
    /// Largest window a request may ask for
    pub max_window: u64,
}

impl Default for GasPriceConfig {
    fn default() -> Self {
        Self {
            default_window: 100,
            max_window: 10_000,
        }
    }
}

/// Ledger Store connection: a full DSN or its parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub dsn: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// Pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            user: None,
            pass: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "blocks".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Explicit DSN if set, otherwise one assembled from the parts
    pub fn dsn(&self) -> Result<String, ConfigError> {
        if let Some(dsn) = self.dsn.as_deref().filter(|d| !d.is_empty()) {
            return Ok(dsn.to_string());
        }
        let user = self
            .user
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError::Invalid("missing database configuration".into()))?;

        let credentials = match self.pass.as_deref() {
            Some(pass) if !pass.is_empty() => format!("{}:{}", user, pass),
            _ => user.to_string(),
        };
        Ok(format!(
            "postgresql://{}@{}:{}/{}",
            credentials, self.host, self.port, self.name
        ))
    }
}

/// Counter Store implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    #[default]
    Redis,
    /// Process-local; counts are lost on restart and not shared between replicas
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub backend: CounterBackend,
    pub url: String,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            backend: CounterBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Which peers may name the client through `X-Forwarded-For`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// List of trusted proxy IPs
    pub trusted_proxies: Vec<IpAddr>,
    /// Trust loopback peers (127.0.0.1, ::1)
    pub trust_localhost: bool,
    /// Trust private IPs (10.x, 172.16.x, 192.168.x)
    pub trust_private_ips: bool,
    /// Number of proxies in chain
    pub proxy_count: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            trusted_proxies: Vec::new(),
            trust_localhost: true,
            trust_private_ips: false,
            proxy_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime, seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string()],
            max_age: 86400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level name or a full `EnvFilter` directive
    pub level: String,
    /// One JSON object per line
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Level as a tracing filter directive.
    ///
    /// Accepts the classic level names (`CRITICAL`, `WARNING`, ...) as well
    /// as tracing's own.
    pub fn filter_directive(&self) -> String {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "critical" | "fatal" | "error" => "error".to_string(),
            "warning" | "warn" => "warn".to_string(),
            "info" => "info".to_string(),
            "debug" => "debug".to_string(),
            "trace" | "notset" => "trace".to_string(),
            _ => self.level.clone(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid admission configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `"300s"`, `"500ms"`, `"5m"` or bare seconds
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        }
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
