use crate::error::ConfigurationError;

/// Wrapper around sensitive values to reduce accidental logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***redacted***")
    }
}

/// Require that `var` resolves to a non-empty value through `lookup`.
pub fn require_var<F>(var: &str, lookup: F) -> Result<SecretValue, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(SecretValue(value)),
        _ => Err(ConfigurationError::MissingSecret(var.to_string())),
    }
}

/// Require that a given environment variable is set and non-empty.
pub fn require_env(var: &str) -> Result<SecretValue, ConfigurationError> {
    require_var(var, |name| std::env::var(name).ok())
}
