//! Configuration loading: TOML file plus environment overrides.
//!
//! ## Search Order
//!
//! 1. `--config <path>` on the command line
//! 2. `BLOCKS_API_CONFIG`
//! 3. `~/.config/blocksapi.toml`
//! 4. `/etc/blocksapi.toml`
//!
//! An explicitly named file must exist. When no file is found the defaults
//! are used. Environment overrides are applied last.

use blocks_api::ApiConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "BLOCKS_API_CONFIG";

const SYSTEM_CONFIG: &str = "/etc/blocksapi.toml";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

/// Loaded configuration and the file it came from, if any
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ApiConfig,
    pub source: Option<PathBuf>,
}

/// Load configuration from the process environment
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, LoadError> {
    load_with(explicit, |var| std::env::var(var).ok())
}

/// Load configuration with `env` standing in for the process environment
pub fn load_with<E>(explicit: Option<&Path>, env: E) -> Result<LoadedConfig, LoadError>
where
    E: Fn(&str) -> Option<String>,
{
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).filter(|p| !p.is_empty()).map(PathBuf::from));

    let source = match named {
        Some(path) => Some(path),
        None => default_locations(env("HOME").as_deref())
            .into_iter()
            .find(|path| path.is_file()),
    };

    let mut config = match &source {
        Some(path) => read_file(path)?,
        None => ApiConfig::default(),
    };
    apply_env_overrides(&mut config, &env)?;

    Ok(LoadedConfig { config, source })
}

/// Candidate files when none is named explicitly
pub fn default_locations(home: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Some(home) = home.filter(|h| !h.is_empty()) {
        paths.push(Path::new(home).join(".config").join("blocksapi.toml"));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG));
    paths
}

/// Parse a TOML config file
pub fn read_file(path: &Path) -> Result<ApiConfig, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `BLOCKS_API_*` overrides on top of the file settings
pub fn apply_env_overrides<E>(config: &mut ApiConfig, env: &E) -> Result<(), LoadError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(dsn) = env("BLOCKS_API_DSN") {
        config.database.dsn = Some(dsn);
    }
    if let Some(port) = env("BLOCKS_API_PORT") {
        config.http.port = parse_var("BLOCKS_API_PORT", &port)?;
    }
    if let Some(url) = env("BLOCKS_API_REDIS_URL") {
        config.counter.url = url;
    }
    if let Some(level) = env("BLOCKS_API_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(size) = env("BLOCKS_API_PAGE_SIZE") {
        config.pagination.page_size = parse_var("BLOCKS_API_PAGE_SIZE", &size)?;
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, LoadError> {
    value.trim().parse().map_err(|_| LoadError::Env {
        var,
        value: value.to_string(),
    })
}
