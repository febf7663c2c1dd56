//! Artifact naming policy
//!
//! Keys look like `20250101_120000_3fa9c2_report.pdf`: a UTC timestamp that
//! sorts lexicographically, a short random nonce, then the original file name.
//! The nonce keeps same-second uploads of the same name apart.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::constants::{ERR_UNSAFE_PATH_COMPONENT, KEY_TIMESTAMP_FORMAT, MAX_PATH_COMPONENT_BYTES};
use crate::error::{AppError, Result};

/// Pieces recovered from a generated key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts {
    pub created_at: DateTime<Utc>,
    pub nonce: String,
    pub original_name: String,
}

/// Whether `name` is usable as exactly one path segment under a storage root
///
/// Rejects anything that could climb out of, or reach below, the owner folder.
pub fn is_safe_path_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name.len() <= MAX_PATH_COMPONENT_BYTES
        && !name.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

fn ensure_safe(name: &str, what: &str) -> Result<()> {
    if is_safe_path_component(name) {
        Ok(())
    } else {
        tracing::warn!("Rejected unsafe {}: {:?}", what, name);
        Err(AppError::InvalidInput(format!(
            "Invalid {}: {}",
            what, ERR_UNSAFE_PATH_COMPONENT
        )))
    }
}

/// Build the storage key for one upload
///
/// Deterministic for fixed inputs. Unsafe owners or file names are rejected
/// rather than rewritten.
pub fn make_key(owner: &str, original_name: &str, now: DateTime<Utc>, nonce: &str) -> Result<String> {
    ensure_safe(owner, "owner")?;
    ensure_safe(original_name, "file name")?;

    if nonce.is_empty() || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidInput(
            "Key nonce must be non-empty and alphanumeric".to_string(),
        ));
    }

    let key = format!(
        "{}_{}_{}",
        now.format(KEY_TIMESTAMP_FORMAT),
        nonce,
        original_name
    );

    // Prefix pushes long names over the limit
    ensure_safe(&key, "file name")?;
    Ok(key)
}

/// Check a caller-supplied key before it is joined onto a storage path
pub fn validate_key(key: &str) -> Result<()> {
    ensure_safe(key, "key")
}

/// Normalize a repository folder such as `/team/reports/` to `team/reports`
///
/// Every segment must be a safe path component. A blank folder is the
/// repository root.
pub fn normalize_folder(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    for segment in &segments {
        ensure_safe(segment, "folder")?;
    }
    Ok(segments.join("/"))
}

/// Split a key produced by [`make_key`] back into its parts
///
/// Returns `None` for names that were not generated by this policy.
pub fn parse_key(key: &str) -> Option<KeyParts> {
    let mut parts = key.splitn(4, '_');
    let date = parts.next()?;
    let time = parts.next()?;
    let nonce = parts.next()?;
    let original_name = parts.next()?;

    if nonce.is_empty() || original_name.is_empty() {
        return None;
    }

    let created_at =
        NaiveDateTime::parse_from_str(&format!("{}_{}", date, time), KEY_TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();

    Some(KeyParts {
        created_at,
        nonce: nonce.to_string(),
        original_name: original_name.to_string(),
    })
}
