use serde::{Deserialize, Serialize};

use crate::naming::is_safe_path_component;

/// User row in the credential file
///
/// Field order matches the file header `username,password,recovery_hint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique, case-sensitive login name; also names the user's storage folder
    pub username: String,
    /// Password hash (`pbkdf2$<iterations>$<salt hex>$<tag hex>`), never the plaintext
    pub password: String,
    /// Free-text reminder chosen at registration
    pub recovery_hint: String,
}

impl User {
    /// Validate that a username can double as a storage folder name
    pub fn validate_username(username: &str) -> bool {
        !username.trim().is_empty()
            && username.trim() == username
            && is_safe_path_component(username)
    }
}
