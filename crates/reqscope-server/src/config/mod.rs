//! Service config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use reqscope_core::error::{Result, ReqScopeError};

pub use schema::{
    LogFormat, LoggingSection, LokiSection, MetricsSection, ServerSection, ServiceConfig,
    SlowSection, UnmatchedRoute,
};

/// Config file looked up in the working directory when no override is given.
pub const DEFAULT_CONFIG_PATH: &str = "reqscope.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "REQSCOPE_CONFIG";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ReqScopeError::BadConfig(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| ReqScopeError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the config source: `$REQSCOPE_CONFIG` (must exist), else
/// `reqscope.yaml` if present, else built-in defaults.
///
/// Returns the path that was loaded, if any, for the startup log line.
pub fn load() -> Result<(ServiceConfig, Option<String>)> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let cfg = load_from_file(&path)?;
        return Ok((cfg, Some(path)));
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        let cfg = load_from_file(DEFAULT_CONFIG_PATH)?;
        return Ok((cfg, Some(DEFAULT_CONFIG_PATH.to_string())));
    }
    Ok((ServiceConfig::default(), None))
}
