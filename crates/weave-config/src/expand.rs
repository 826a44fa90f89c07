//! `${VAR}` and `${VAR:-default}` expansion in configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// Values without a `${` are returned as written, so a lone `$VAR` stays
/// literal. `field` names the configuration key in errors.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

fn lookup(var: &str) -> Result<Option<String>, UnsetVar> {
    std::env::var(var).map(Some).map_err(|_| UnsetVar)
}

/// An unset variable without a default.
#[derive(Debug)]
struct UnsetVar;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_literal_is_unchanged() {
        assert_eq!(
            expand_env("https://docs.example.com/", "include.base_uri").unwrap(),
            "https://docs.example.com/"
        );
    }

    #[test]
    fn test_bare_dollar_is_unchanged() {
        assert_eq!(expand_env("$HOME/docs", "include.cache_dir").unwrap(), "$HOME/docs");
    }

    #[test]
    fn test_set_var_is_substituted() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("WEAVE_TEST_DOCS_HOST", "docs.example.com");
        }
        let result = expand_env("https://${WEAVE_TEST_DOCS_HOST}/snippets/", "include.base_uri");
        unsafe {
            std::env::remove_var("WEAVE_TEST_DOCS_HOST");
        }

        assert_eq!(result.unwrap(), "https://docs.example.com/snippets/");
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("WEAVE_TEST_UNSET_ROOT");
        }

        assert_eq!(
            expand_env("${WEAVE_TEST_UNSET_ROOT:-docs}/shared", "include.base_uri").unwrap(),
            "docs/shared"
        );
    }

    #[test]
    fn test_unset_without_default_names_var_and_field() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("WEAVE_TEST_MISSING");
        }

        let err = expand_env("${WEAVE_TEST_MISSING}", "include.cache_dir").unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert_eq!(
            err.to_string(),
            "Environment variable error in include.cache_dir: ${WEAVE_TEST_MISSING} not set"
        );
    }
}
