use std::sync::OnceLock;

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use rand::RngCore;
use sha2::Sha256;

use crate::constants::{
    KEY_NONCE_LEN, PASSWORD_HASH_SCHEME, PASSWORD_PBKDF2_ITERATIONS, PASSWORD_SALT_BYTES,
    SESSION_TOKEN_BYTES,
};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash a password for storage in the credential file
///
/// PBKDF2-HMAC-SHA256 over the password with a fresh random salt. The derived
/// key is then sealed with an HMAC keyed by the salt, which lets verification
/// compare tags with [`Mac::verify_slice`].
///
/// # Format
/// `pbkdf2$<iterations>$<salt hex>$<tag hex>`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; PASSWORD_SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    hash_with_salt(password, &salt, PASSWORD_PBKDF2_ITERATIONS)
}

fn password_mac(password: &str, salt: &[u8], iterations: u32) -> HmacSha256 {
    let mut derived = [0u8; 32];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut derived)
        .expect("HMAC can take key of any size");

    let mut mac = HmacSha256::new_from_slice(salt).expect("HMAC can take key of any size");
    mac.update(&derived);
    mac
}

fn hash_with_salt(password: &str, salt: &[u8], iterations: u32) -> String {
    let tag = password_mac(password, salt, iterations).finalize().into_bytes();
    format!(
        "{}${}${}${}",
        PASSWORD_HASH_SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(tag)
    )
}

/// Verify a password against a value produced by [`hash_password`]
///
/// Comparison is constant time. Malformed stored values never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut fields = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt_hex), Some(tag_hex), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        tracing::warn!("Stored password hash has an unexpected layout");
        return false;
    };

    if scheme != PASSWORD_HASH_SCHEME {
        tracing::warn!("Unsupported password hash scheme: {}", scheme);
        return false;
    }

    let iterations = match iterations.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            tracing::warn!("Stored password hash has an invalid iteration count");
            return false;
        }
    };

    let (salt, tag) = match (hex::decode(salt_hex), hex::decode(tag_hex)) {
        (Ok(salt), Ok(tag)) => (salt, tag),
        _ => {
            tracing::warn!("Stored password hash is not valid hex");
            return false;
        }
    };

    password_mac(password, &salt, iterations)
        .verify_slice(&tag)
        .is_ok()
}

/// Run a full verification against a throwaway hash
///
/// Used when a login names an unknown user, so the response takes as long as
/// a wrong password would.
pub fn burn_password_check(password: &str) {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("unknown-user"));
    let _ = verify_password(password, dummy);
}

// =============================================================================
// Random Identifiers
// =============================================================================

/// Random lowercase hex nonce for artifact keys
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; KEY_NONCE_LEN.div_ceil(2)];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut nonce = hex::encode(bytes);
    nonce.truncate(KEY_NONCE_LEN);
    nonce
}

/// Random bearer token identifying a login session
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
