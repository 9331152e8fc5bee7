//! Shared-secret sourcing for signature verification.
//!
//! The secret is looked up on every request instead of once at startup, so a
//! process started without configuration keeps serving and answers each
//! delivery with a misconfiguration error until the secret appears.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable consulted by default for the shared secret.
pub const DEFAULT_SECRET_ENV_VAR: &str = "WEBHOOK_SECRET";

// ============================================================================
// SecretValue
// ============================================================================

/// A shared secret whose memory is cleared on drop.
///
/// `Debug` output never contains the value.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    /// Wrap a secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get secret as bytes (only for immediate use)
    pub fn expose_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValue")
            .field("inner", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// SecretSource
// ============================================================================

/// Supplier of the shared secret used to verify signatures.
pub trait SecretSource: Send + Sync {
    /// Return the secret if one is currently configured.
    ///
    /// An empty value counts as not configured.
    fn current_secret(&self) -> Option<SecretValue>;

    /// Operator-facing name of the secret, used in misconfiguration messages.
    fn secret_name(&self) -> &str;
}

/// Reads the secret from a process environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvSecretSource {
    var_name: String,
}

impl EnvSecretSource {
    /// Read the secret from the variable named `var_name`.
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl Default for EnvSecretSource {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_ENV_VAR)
    }
}

impl SecretSource for EnvSecretSource {
    fn current_secret(&self) -> Option<SecretValue> {
        std::env::var(&self.var_name)
            .ok()
            .filter(|value| !value.is_empty())
            .map(SecretValue::new)
    }

    fn secret_name(&self) -> &str {
        &self.var_name
    }
}

/// A fixed secret, or a fixed absence of one.
///
/// Useful when embedding the pipeline or in tests that must not depend on
/// process environment.
#[derive(Debug, Clone)]
pub struct StaticSecretSource {
    secret: Option<SecretValue>,
}

impl StaticSecretSource {
    /// Always return `secret`.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(SecretValue::new(secret)),
        }
    }

    /// Behave as if no secret were configured.
    pub fn unconfigured() -> Self {
        Self { secret: None }
    }
}

impl SecretSource for StaticSecretSource {
    fn current_secret(&self) -> Option<SecretValue> {
        self.secret.clone().filter(|s| !s.is_empty())
    }

    fn secret_name(&self) -> &str {
        DEFAULT_SECRET_ENV_VAR
    }
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
