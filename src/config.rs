use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DashboardError, Result};

pub const DEFAULT_SOURCE: &str = "log_modelo.xlsx";
pub const DEFAULT_SHEET: &str = "Datos del informe 1";
pub const DEFAULT_HEADER_ROW: usize = 2;
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Top-level configuration, usually read from a TOML file
///
/// ```toml
/// [source]
/// path = "log_modelo.xlsx"
/// sheet = "Datos del informe 1"
/// header_row = 2
///
/// [web]
/// bind = "127.0.0.1:3000"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: SourceConfig,
    pub web: WebConfig,
}

/// Where the access log comes from and how its header is laid out
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Sheet name, ignored for CSV sources
    pub sheet: String,
    /// Zero-based row holding the column headers
    pub header_row: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            path: PathBuf::from(DEFAULT_SOURCE),
            sheet: DEFAULT_SHEET.to_string(),
            header_row: DEFAULT_HEADER_ROW,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DashboardError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DashboardError::Config(e.to_string()))
    }

    /// Apply command-line overrides on top of the file values
    pub fn with_overrides(
        mut self,
        path: Option<PathBuf>,
        sheet: Option<String>,
        header_row: Option<usize>,
    ) -> Self {
        if let Some(path) = path {
            self.source.path = path;
        }
        if let Some(sheet) = sheet {
            self.source.sheet = sheet;
        }
        if let Some(header_row) = header_row {
            self.source.header_row = header_row;
        }
        self
    }
}
