use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Storage medium an artifact lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Remote,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "remote" | "github" => Ok(Backend::Remote),
            other => Err(AppError::InvalidInput(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// Parse a comma separated target list such as `local,remote`
pub fn parse_targets(raw: &str) -> Result<BTreeSet<Backend>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Backend::from_str)
        .collect()
}

/// Object as reported by a single backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    /// Local file path or repository path
    pub location: String,
    /// Browsable URL, when the backend has one
    pub url: Option<String>,
}

/// One stored file blob plus its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub owner: String,
    pub original_name: String,
    pub key: String,
    pub size: u64,
    pub backend: Backend,
    /// Upload time taken from the key; `None` for files not named by an upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
