//! Service configuration loading
//!
//! The service list is read once at startup from an inline CLI string, an
//! explicit path, the `RUNZ_CONFIG` environment variable, or a `runz.*` file
//! in the working directory.

use jsonc_parser::ParseOptions;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Maximum number of services accepted in one configuration
pub const MAX_SERVICES: usize = 200;

/// Environment variable holding a config path
pub const CONFIG_ENV_VAR: &str = "RUNZ_CONFIG";

/// File names probed in the working directory, in order
pub const DEFAULT_CANDIDATES: &[&str] = &["runz.yaml", "runz.yml", "runz.json", "runz.jsonc", "runz.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config: {message}")]
    Parse { format: String, message: String },

    #[error("unsupported config format {0:?}; expected yaml, yml, json, jsonc or toml")]
    UnsupportedFormat(String),

    #[error("invalid inline config; expected <format>|<config_data>")]
    InvalidInline,

    #[error("no services defined in config")]
    NoServices,

    #[error("too many services defined in config; maximum allowed is {MAX_SERVICES}")]
    TooManyServices,

    #[error("service '{0}' has no program defined")]
    MissingProgram(String),

    #[error("duplicate service id {0:?}")]
    DuplicateId(String),

    #[error("no config provided and no config file found")]
    NotFound,
}

/// One supervised service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique id, stable for the process lifetime
    pub id: String,
    /// Program to run
    pub prog: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory
    #[serde(default)]
    pub wdir: Option<PathBuf>,
    /// Display label
    #[serde(default)]
    pub name: Option<String>,
}

impl ServiceConfig {
    pub fn new(id: impl Into<String>, prog: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prog: prog.into(),
            args: Vec::new(),
            wdir: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wdir(mut self, wdir: impl Into<PathBuf>) -> Self {
        self.wdir = Some(wdir.into());
        self
    }

    /// Label shown on tabs and in the combined view; falls back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.id)
    }
}

/// Service record as written by the user
#[derive(Debug, Clone, Deserialize)]
struct RawServiceConfig {
    id: Option<String>,
    prog: String,
    args: Option<Vec<String>>,
    name: Option<String>,
    wdir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    services: Vec<RawServiceConfig>,
}

/// Validated application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Application title
    pub name: String,
    pub services: Vec<ServiceConfig>,
}

/// Where to look for configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Inline `<format>|<data>` string
    pub raw: Option<String>,
    /// Explicit config file
    pub path: Option<PathBuf>,
}

impl Config {
    /// Build a configuration from already-resolved services
    pub fn new(name: impl Into<String>, services: Vec<ServiceConfig>) -> Result<Self, ConfigError> {
        validate_services(&services)?;
        Ok(Self {
            name: name.into(),
            services,
        })
    }

    /// Parse configuration text in the given format, resolving relative
    /// working directories against `basedir`
    pub fn parse(format: &str, data: &str, basedir: &Path) -> Result<Self, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse {
            format: format.to_string(),
            message,
        };

        let raw: RawConfig = match format {
            "yaml" | "yml" => serde_yaml::from_str(data).map_err(|e| parse_err(e.to_string()))?,
            "json" => serde_json::from_str(data).map_err(|e| parse_err(e.to_string()))?,
            "jsonc" => {
                let value = jsonc_parser::parse_to_serde_value(data, &ParseOptions::default())
                    .map_err(|e| parse_err(e.to_string()))?
                    .ok_or_else(|| parse_err("empty document".to_string()))?;
                serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))?
            }
            "toml" => toml::from_str(data).map_err(|e| parse_err(e.to_string()))?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        Self::resolve(raw, basedir)
    }

    /// Load configuration from the first available source
    pub fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;

        if let Some(raw) = &source.raw {
            info!("Using inline config from command line");
            let (format, data) = raw.split_once('|').ok_or(ConfigError::InvalidInline)?;
            return Self::parse(format.trim(), data.trim().trim_matches('"'), &cwd);
        }

        let path = find_config_path(source.path.as_deref(), &cwd).ok_or(ConfigError::NotFound)?;
        Self::load_file(&path, &cwd)
    }

    /// Load configuration from a file; the extension selects the format
    pub fn load_file(path: &Path, basedir: &Path) -> Result<Self, ConfigError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml")
            .to_ascii_lowercase();

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&format, &data, basedir)
    }

    fn resolve(raw: RawConfig, basedir: &Path) -> Result<Self, ConfigError> {
        if raw.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        if raw.services.len() > MAX_SERVICES {
            return Err(ConfigError::TooManyServices);
        }

        let mut services = Vec::with_capacity(raw.services.len());
        for (index, service) in raw.services.into_iter().enumerate() {
            if service.prog.trim().is_empty() {
                let label = service.name.or(service.id).unwrap_or_else(|| "unnamed".to_string());
                return Err(ConfigError::MissingProgram(label));
            }

            let wdir = match service.wdir {
                Some(dir) => {
                    let dir = Path::new(&dir);
                    if dir.is_absolute() {
                        dir.clean()
                    } else {
                        basedir.join(dir).clean()
                    }
                }
                None => basedir.to_path_buf(),
            };

            services.push(ServiceConfig {
                id: service.id.unwrap_or_else(|| index.to_string()),
                name: Some(service.name.unwrap_or_else(|| service.prog.clone())),
                args: service.args.unwrap_or_default(),
                prog: service.prog,
                wdir: Some(wdir),
            });
        }

        validate_services(&services)?;

        Ok(Self {
            name: raw.name.unwrap_or_else(|| "runz".to_string()),
            services,
        })
    }
}

fn validate_services(services: &[ServiceConfig]) -> Result<(), ConfigError> {
    if services.is_empty() {
        return Err(ConfigError::NoServices);
    }
    if services.len() > MAX_SERVICES {
        return Err(ConfigError::TooManyServices);
    }

    let mut seen = HashSet::new();
    for service in services {
        if service.prog.trim().is_empty() {
            return Err(ConfigError::MissingProgram(service.display_name().to_string()));
        }
        if !seen.insert(service.id.as_str()) {
            return Err(ConfigError::DuplicateId(service.id.clone()));
        }
    }
    Ok(())
}

/// Pick the config file: explicit path, then `RUNZ_CONFIG`, then defaults in `cwd`
fn find_config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        info!("Using config path from command line");
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        info!("Using config path from {} environment variable", CONFIG_ENV_VAR);
        return Some(PathBuf::from(path));
    }

    for file in DEFAULT_CANDIDATES {
        let path = cwd.join(file);
        if path.exists() {
            info!("Using config file: {}", path.display());
            return Some(path);
        }
    }
    None
}
