use relay_core::{error::RelayError, types::SERVER_SENDER};

/// Normalize and check the username carried by a `join` frame.
///
/// Surrounding whitespace is trimmed. The name must be non-empty, at most
/// `max_len` characters, free of control characters, and must not impersonate
/// the server sender.
pub fn validate_username(raw: &str, max_len: usize) -> Result<String, RelayError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(invalid("username is empty"));
    }
    if name.chars().count() > max_len {
        return Err(invalid(format!("username longer than {max_len} characters")));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("username contains control characters"));
    }
    if name.eq_ignore_ascii_case(SERVER_SENDER) {
        return Err(invalid("username is reserved"));
    }
    Ok(name.to_string())
}

fn invalid(reason: impl Into<String>) -> RelayError {
    RelayError::InvalidUsername {
        reason: reason.into(),
    }
}
