use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::LookupOptions;

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read store config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse store config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize store config {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write store config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which catalogs a store loads and how lookups treat message states.
/// （描述語系目錄來源與查詢行為的設定。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Expected catalog language; loading fails when the files declare another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Catalog files in merge order; later files override earlier ones.
    #[serde(default)]
    pub catalogs: Vec<PathBuf>,
    #[serde(default)]
    pub include_obsolete: bool,
    #[serde(default = "default_true")]
    pub include_unfinished: bool,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            locale: None,
            catalogs: Vec::new(),
            include_obsolete: false,
            include_unfinished: true,
        }
    }
}

impl StoreConfig {
    /// Reads a config file; relative catalog paths resolve against its directory.
    /// （讀取設定檔，相對路徑以設定檔所在目錄為基準。）
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: StoreConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.sanitize();
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        self.locale = self
            .locale
            .take()
            .map(|locale| locale.trim().to_string())
            .filter(|locale| !locale.is_empty());
        let mut seen = Vec::with_capacity(self.catalogs.len());
        self.catalogs.retain(|path| {
            if path.as_os_str().is_empty() || seen.contains(path) {
                false
            } else {
                seen.push(path.clone());
                true
            }
        });
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        for catalog in &mut self.catalogs {
            if catalog.is_relative() {
                *catalog = base.join(&*catalog);
            }
        }
    }

    pub fn lookup_options(&self) -> LookupOptions {
        LookupOptions {
            include_obsolete: self.include_obsolete,
            include_unfinished: self.include_unfinished,
        }
    }
}
