// config.rs: extractor configuration, JSON loader and process-wide cache
use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use crate::error::ConfigError;
use crate::extractor::{DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};
use crate::record::DEFAULT_RECORD_PREFIX;

pub const CONFIG_VERSION: u32 = 1;

/// A single-byte field separator: any ASCII byte except NUL, which ends the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Delimiter(u8);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(b',');

    pub fn new(byte: u8) -> Result<Self, ConfigError> {
        if byte == 0 || !byte.is_ascii() {
            return Err(ConfigError::InvalidDelimiter(String::from_utf8_lossy(&[byte]).into_owned()));
        }
        Ok(Delimiter(byte))
    }

    pub const fn byte(self) -> u8 {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::COMMA
    }
}

impl TryFrom<&str> for Delimiter {
    type Error = ConfigError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.as_bytes() {
            [b] => Delimiter::new(*b),
            _ => Err(ConfigError::InvalidDelimiter(s.to_string())),
        }
    }
}

impl TryFrom<String> for Delimiter {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Delimiter::try_from(s.as_str())
    }
}

impl From<Delimiter> for String {
    fn from(d: Delimiter) -> Self {
        char::from(d.0).to_string()
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub version: Option<u32>,
    pub delimiter: Delimiter,
    pub buffer_capacity: usize,
    /// Marker preceding the payload on reader lines, e.g. `GPS_DATA:`.
    pub record_prefix: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            version: None,
            delimiter: Delimiter::COMMA,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            record_prefix: Some(DEFAULT_RECORD_PREFIX.to_string()),
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(v) = self.version {
            if v != CONFIG_VERSION {
                return Err(ConfigError::UnsupportedVersion(v));
            }
        }
        check_capacity(self.buffer_capacity)
    }
}

/// Reject buffer capacities outside `1..=MAX_BUFFER_CAPACITY`.
pub fn check_capacity(capacity: usize) -> Result<(), ConfigError> {
    if capacity == 0 || capacity > MAX_BUFFER_CAPACITY {
        return Err(ConfigError::InvalidCapacity(capacity));
    }
    Ok(())
}

pub fn config_from_json(json: &str) -> Result<ExtractorConfig, ConfigError> {
    let cfg: ExtractorConfig = serde_json::from_str(json)?;
    cfg.validate()?;
    Ok(cfg)
}

pub struct LoadedConfig {
    /// `None` when the config was set from an in-memory JSON string.
    pub path: Option<String>,
    pub mtime: Option<SystemTime>,
    pub config: ExtractorConfig,
}

impl LoadedConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Self { path: None, mtime: None, config: config_from_json(json)? })
    }
}

pub static CONFIG_CACHE: Lazy<RwLock<Option<LoadedConfig>>> = Lazy::new(|| RwLock::new(None));

fn read_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

pub fn load_config_internal(config_path: &str) -> Result<LoadedConfig, ConfigError> {
    let data = fs::read_to_string(config_path)
        .map_err(|source| ConfigError::Read { path: config_path.to_string(), source })?;
    let config = config_from_json(&data)?;
    let mtime = read_mtime(Path::new(config_path));
    Ok(LoadedConfig { path: Some(config_path.to_string()), mtime, config })
}

/// Load `config_path` into the cache unless it is already cached with the
/// same modification time.
pub fn ensure_config_loaded(config_path: &str) -> Result<(), ConfigError> {
    let mut guard = CONFIG_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    let need_reload = match guard.as_ref() {
        None => true,
        Some(lc) => {
            if lc.path.as_deref() != Some(config_path) {
                true
            } else {
                read_mtime(Path::new(config_path)) != lc.mtime
            }
        }
    };
    if need_reload {
        debug!("loading extractor config from {}", config_path);
        *guard = Some(load_config_internal(config_path)?);
    }
    Ok(())
}

pub fn store_config(loaded: LoadedConfig) {
    let mut guard = CONFIG_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(loaded);
}

/// The cached config, or the defaults when nothing has been loaded.
pub fn current_config() -> ExtractorConfig {
    let guard = CONFIG_CACHE.read().unwrap_or_else(PoisonError::into_inner);
    guard.as_ref().map(|lc| lc.config.clone()).unwrap_or_default()
}
