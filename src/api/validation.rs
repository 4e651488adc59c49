use regex::Regex;
use std::sync::OnceLock;

use super::ApiError;

const MAX_SERVER_ID_LEN: usize = 255;

/// Normalizes a user-supplied server id: trimmed, lowercased, whitespace runs
/// collapsed to `-`. Only `a-z`, `0-9`, `-` and `_` survive validation.
pub fn validate_server_id(raw: &str) -> Result<String, ApiError> {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"));

    let normalized = re.replace_all(raw.trim(), "-").to_lowercase();

    if normalized.is_empty() {
        return Err(ApiError::validation("Server ID cannot be empty"));
    }

    if normalized.chars().count() > MAX_SERVER_ID_LEN {
        return Err(ApiError::validation(format!(
            "Server ID must be {MAX_SERVER_ID_LEN} characters or less"
        )));
    }

    if !normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Server ID can only contain letters, numbers, spaces, hyphens, and underscores",
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_server_id_normalizes() {
        assert_eq!(validate_server_id("My Server").unwrap(), "my-server");
        assert_eq!(validate_server_id("  Big   SMP\t2 ").unwrap(), "big-smp-2");
        assert_eq!(validate_server_id("already-ok_1").unwrap(), "already-ok_1");
    }

    #[test]
    fn test_validate_server_id_rejects() {
        assert!(validate_server_id("").is_err());
        assert!(validate_server_id("   ").is_err());
        assert!(validate_server_id("bad/../id").is_err());
        assert!(validate_server_id("émoji").is_err());
        assert!(validate_server_id(&"a".repeat(256)).is_err());
        assert!(validate_server_id(&"a".repeat(255)).is_ok());
    }
}
