//! Service configuration.
//!
//! Configuration comes from an optional YAML file, then command-line flags
//! override individual fields. Every field has a default, so an empty file
//! (or no file) is a valid configuration:
//!
//! ```yaml
//! server:
//!   host: 127.0.0.1
//!   port: 8080
//! limits:
//!   max_depth: 32
//!   max_iterations: 5000
//!   max_output_bytes: 1048576
//! cache:
//!   enabled: true
//!   capacity: 512
//!   max_bytes: 4194304
//! log_filter: stencil=debug,info
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use stencil_render::{Engine, Limits, TemplateCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_MAX_BYTES};

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub limits: Limits,
    pub cache: CacheConfig,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: Limits::default(),
            cache: CacheConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `host:port`, suitable for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    /// Budget for the total source text held by the cache.
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CACHE_CAPACITY,
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|source| ServiceError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Builds the engine described by this configuration.
    pub fn engine(&self) -> Engine {
        let engine = Engine::with_limits(self.limits);
        if self.cache.enabled {
            engine.with_template_cache(TemplateCache::with_budget(
                self.cache.capacity,
                self.cache.max_bytes,
            ))
        } else {
            engine
        }
    }
}

/// Command-line flags for the `stencil` binary.
#[derive(Debug, Default, Parser)]
#[command(name = "stencil", version, about = "Render and validate Jinja-style templates over HTTP")]
pub struct Cli {
    /// YAML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Maximum nesting of blocks and expressions.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Maximum loop iterations per render.
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,

    /// Maximum rendered output size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_output_bytes: Option<usize>,

    /// Disable the parsed-template cache.
    #[arg(long)]
    pub no_cache: bool,
}

impl Cli {
    /// Loads the config file, if any, and applies the flag overrides.
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };
        Ok(self.apply(config))
    }

    pub fn apply(&self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(max_depth) = self.max_depth {
            config.limits.max_depth = max_depth;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.limits.max_iterations = max_iterations;
        }
        if let Some(max_output_bytes) = self.max_output_bytes {
            config.limits.max_output_bytes = Some(max_output_bytes);
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        config
    }
}
