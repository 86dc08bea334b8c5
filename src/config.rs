//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs.

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Arguments
/// * `new_name` - The new environment variable name (preferred)
/// * `old_name` - The deprecated environment variable name (fallback)
///
/// # Returns
/// * `Some(value)` - The environment variable value
/// * `None` - Neither variable is set
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns the default when neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// データベースURLを取得
///
/// 環境変数 `RELAYHUB_DATABASE_URL`（旧: `DATABASE_URL`）から取得し、
/// 未設定の場合はホームディレクトリ配下の既定パスを使用する。
pub fn get_database_url() -> String {
    get_env_with_fallback("RELAYHUB_DATABASE_URL", "DATABASE_URL").unwrap_or_else(|| {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        format!("sqlite:{}/.relayhub/relayhub.db", home)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_env_with_fallback_new_name() {
        std::env::set_var("TEST_NEW_VAR", "new_value");
        std::env::remove_var("TEST_OLD_VAR");

        let result = get_env_with_fallback("TEST_NEW_VAR", "TEST_OLD_VAR");
        assert_eq!(result, Some("new_value".to_string()));

        std::env::remove_var("TEST_NEW_VAR");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_old_name() {
        std::env::remove_var("TEST_NEW_VAR2");
        std::env::set_var("TEST_OLD_VAR2", "old_value");

        let result = get_env_with_fallback("TEST_NEW_VAR2", "TEST_OLD_VAR2");
        assert_eq!(result, Some("old_value".to_string()));

        std::env::remove_var("TEST_OLD_VAR2");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_neither() {
        std::env::remove_var("TEST_NEW_VAR3");
        std::env::remove_var("TEST_OLD_VAR3");

        let result = get_env_with_fallback("TEST_NEW_VAR3", "TEST_OLD_VAR3");
        assert_eq!(result, None);
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_new_takes_precedence() {
        std::env::set_var("TEST_NEW_VAR4", "new_value");
        std::env::set_var("TEST_OLD_VAR4", "old_value");

        let result = get_env_with_fallback("TEST_NEW_VAR4", "TEST_OLD_VAR4");
        assert_eq!(result, Some("new_value".to_string()));

        std::env::remove_var("TEST_NEW_VAR4");
        std::env::remove_var("TEST_OLD_VAR4");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_or_default() {
        std::env::remove_var("TEST_NEW_VAR5");
        std::env::remove_var("TEST_OLD_VAR5");

        let result = get_env_with_fallback_or("TEST_NEW_VAR5", "TEST_OLD_VAR5", "default_value");
        assert_eq!(result, "default_value");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_parse() {
        std::env::set_var("TEST_NEW_VAR6", "8080");
        std::env::remove_var("TEST_OLD_VAR6");

        let result: u16 = get_env_with_fallback_parse("TEST_NEW_VAR6", "TEST_OLD_VAR6", 3000);
        assert_eq!(result, 8080);

        std::env::remove_var("TEST_NEW_VAR6");
    }

    #[test]
    #[serial]
    fn test_get_env_with_fallback_parse_invalid_uses_default() {
        std::env::set_var("TEST_NEW_VAR7", "not-a-number");

        let result: u16 = get_env_with_fallback_parse("TEST_NEW_VAR7", "TEST_OLD_VAR7", 3000);
        assert_eq!(result, 3000);

        std::env::remove_var("TEST_NEW_VAR7");
    }
}
