//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LEN: usize = 64;

/// Longest accepted secret, in bytes; bounds the work done by the hasher
pub const MAX_SECRET_LEN: usize = 1024;

/// Validate username
///
/// Expects an already trimmed value.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username and password required".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {} characters long",
            MAX_USERNAME_LEN
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username cannot contain spaces or control characters".to_string());
    }

    Ok(())
}

/// Validate secret
///
/// Only presence and an upper bound are checked; there is no password policy.
pub fn validate_secret(secret: &str) -> Result<(), String> {
    if secret.is_empty() {
        return Err("Username and password required".to_string());
    }

    if secret.len() > MAX_SECRET_LEN {
        return Err(format!(
            "Password must be at most {} bytes long",
            MAX_SECRET_LEN
        ));
    }

    Ok(())
}
