//! Sensitive data marker for automatic redaction
//!
//! Object-store credentials live in the run configuration. Wrapping them in
//! `Sensitive<T>` keeps them out of `Debug` dumps of that configuration and
//! out of every log line.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use cassnap_core_types::Sensitive;
///
/// let secret_key = Sensitive::new("wJalrXUtnFEMI");
/// assert_eq!(format!("{:?}", secret_key), "***REDACTED***");
/// assert_eq!(secret_key.expose(), &"wJalrXUtnFEMI");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying sensitive value
    ///
    /// Only the object-store client should need this.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_redaction() {
        let secret = Sensitive::new("my-secret-key");
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "***REDACTED***");
        assert!(!debug_str.contains("my-secret-key"));
    }

    #[test]
    fn test_sensitive_display_redaction() {
        let secret = Sensitive::new("AKIA12345");
        assert_eq!(format!("{}", secret), "***REDACTED***");
    }

    #[test]
    fn test_sensitive_into_inner() {
        let secret = Sensitive::new(String::from("test"));
        assert_eq!(secret.into_inner(), "test");
    }

    #[test]
    fn test_sensitive_deserializes_transparently() {
        #[derive(Deserialize)]
        struct Remote {
            bucket: String,
            secret_key: Sensitive<String>,
        }

        let remote: Remote = toml::from_str("bucket = \"b\"\nsecret_key = \"s3cr3t\"").unwrap();
        assert_eq!(remote.bucket, "b");
        assert_eq!(remote.secret_key.expose(), "s3cr3t");
        assert_eq!(format!("{:?}", remote.secret_key), "***REDACTED***");
    }
}
