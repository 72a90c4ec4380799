//! Identifier escaping for generated SQL

use crate::error::{ModelError, ModelResult};

/// Escape a SQL identifier, quoting each dot-separated part.
///
/// ```
/// use model_handle::security::escape_identifier;
///
/// assert_eq!(escape_identifier("users"), "\"users\"");
/// assert_eq!(escape_identifier("users.id"), "\"users\".\"id\"");
/// assert_eq!(escape_identifier("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn escape_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Reject identifiers that cannot name a table or column
pub fn validate_identifier(identifier: &str) -> ModelResult<()> {
    if identifier.trim().is_empty() {
        return Err(ModelError::Query("Identifier cannot be empty".to_string()));
    }
    if identifier.split('.').any(|part| part.is_empty()) {
        return Err(ModelError::Query(format!(
            "Identifier '{}' has an empty segment",
            identifier
        )));
    }
    if identifier.contains('\0') {
        return Err(ModelError::Query(
            "Identifier cannot contain NUL bytes".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("users.id").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("users.").is_err());
        assert!(validate_identifier("a\0b").is_err());
    }
}
