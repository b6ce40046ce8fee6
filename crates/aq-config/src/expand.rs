//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    // Fast path: no expansion needed
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var).map(Some).map_err(|_| UnsetVar {
            name: var.to_owned(),
        })
    })
    .map(|cow| cow.into_owned())
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.name),
    })
}

/// Error returned when environment variable lookup fails.
struct UnsetVar {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_simple_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("AQ_EXPAND_SIMPLE", "hello");
        }
        let result = expand_env("${AQ_EXPAND_SIMPLE}", "test.field").unwrap();
        assert_eq!(result, "hello");
        unsafe {
            std::env::remove_var("AQ_EXPAND_SIMPLE");
        }
    }

    #[test]
    fn default_applies_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("AQ_EXPAND_UNSET");
        }
        let result = expand_env("${AQ_EXPAND_UNSET:-plantuml}", "test.field").unwrap();
        assert_eq!(result, "plantuml");
    }

    #[test]
    fn missing_var_is_an_error() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("AQ_EXPAND_MISSING");
        }
        let err = expand_env("${AQ_EXPAND_MISSING}", "tools.plantuml").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("AQ_EXPAND_MISSING"));
        assert!(err.to_string().contains("tools.plantuml"));
    }

    #[test]
    fn literal_passes_through() {
        let result = expand_env("latexmk", "tools.latexmk").unwrap();
        assert_eq!(result, "latexmk");
    }

    #[test]
    fn embedded_var_expands_in_place() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("AQ_EXPAND_HOME", "/opt/tex");
        }
        let result = expand_env("${AQ_EXPAND_HOME}/bin/latexmk", "tools.latexmk").unwrap();
        assert_eq!(result, "/opt/tex/bin/latexmk");
        unsafe {
            std::env::remove_var("AQ_EXPAND_HOME");
        }
    }
}
