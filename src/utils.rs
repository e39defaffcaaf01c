use axum::http::HeaderMap;
use std::collections::HashSet;

/// Validate that a secret key meets basic strength requirements.
///
/// Checks minimum length, single-character repetition, short repeating
/// patterns, and character diversity for long secrets.
pub fn validate_secret_strength(secret: &str, min_length: usize) -> Result<(), String> {
    if secret.len() < min_length {
        return Err(format!(
            "secret must be at least {} characters long",
            min_length
        ));
    }

    if let Some(first) = secret.chars().next() {
        if secret.chars().all(|c| c == first) {
            return Err("secret must not consist of a single repeated character".to_string());
        }
    }

    if secret.len() >= 4 {
        for pattern_len in 2..=(secret.len() / 2).min(8) {
            if !secret.is_char_boundary(pattern_len) {
                continue;
            }
            let pattern = &secret[..pattern_len];
            let repetitions = secret.len() / pattern_len;
            if secret.starts_with(&pattern.repeat(repetitions)) {
                return Err("secret must not contain simple repeating patterns".to_string());
            }
        }
    }

    if secret.len() >= 32 {
        let unique: HashSet<char> = secret.chars().collect();
        if unique.len() < 8 {
            return Err("secret must contain at least 8 different characters".to_string());
        }
    }

    Ok(())
}

/// Name of the cookie carrying the access token.
pub const AUTH_COOKIE: &str = "Authorization";

/// Extract a named cookie value from request headers.
///
/// Clients carry the bearer token in an `Authorization` cookie rather than
/// an Authorization header, so this runs on every protected request.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(name) {
            return parts.next().map(|v| v.to_string());
        }
    }
    None
}
