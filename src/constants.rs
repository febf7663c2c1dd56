/// Maximum upload size in bytes (25MB)
/// The GitHub Contents API rejects larger blobs anyway
pub const MAX_UPLOAD_SIZE_BYTES: usize = 26_214_400;

/// Warning threshold for large uploads (5MB)
/// Log when uploads exceed this size for monitoring
pub const WARN_UPLOAD_SIZE_BYTES: usize = 5_242_880;

/// Length of the random hex nonce embedded in every artifact key
pub const KEY_NONCE_LEN: usize = 6;

/// Timestamp layout embedded in artifact keys (UTC, sorts lexicographically)
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Longest file or folder name accepted as a storage path component
pub const MAX_PATH_COMPONENT_BYTES: usize = 255;

/// Random bytes in a session token (hex encoded to twice this length)
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Session lifetime in seconds (12 hours)
pub const SESSION_TTL_SECS: i64 = 43_200;

/// Random bytes of salt per stored password
pub const PASSWORD_SALT_BYTES: usize = 16;

/// PBKDF2-HMAC-SHA256 rounds for new password hashes
/// Stored per row, so raising it leaves existing rows verifiable
pub const PASSWORD_PBKDF2_ITERATIONS: u32 = 100_000;

/// Scheme tag at the start of every stored password hash
pub const PASSWORD_HASH_SCHEME: &str = "pbkdf2";

/// Header row of the credential file
pub const CREDENTIALS_HEADER: [&str; 3] = ["username", "password", "recovery_hint"];

/// Folder under `{prefix}/{owner}/` that holds remote uploads
pub const REMOTE_UPLOADS_DIR: &str = "uploads";

/// Media type requested from the GitHub REST API
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// User agent sent to the GitHub REST API (requests without one are rejected)
pub const USER_AGENT: &str = concat!("filesaver-server/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for registrations with blank fields
pub const ERR_FIELDS_REQUIRED: &str = "Username, password and recovery hint are required";

/// Error message for an upload without a file name
pub const ERR_NAME_REQUIRED: &str = "File name is required";

/// Error message for an upload without any target backend
pub const ERR_NO_TARGETS: &str = "At least one upload target (local, remote) is required";

/// Error message for names that could escape the owner's folder
pub const ERR_UNSAFE_PATH_COMPONENT: &str =
    "Name must be a single path component without separators or control characters";
