//! Codec configuration and secret source.
//!
//! # Responsibility
//! - Carry the process-wide secret and token shape options as plain values.
//! - Validate options before any codec is built from them.
//!
//! # Invariants
//! - The secret is never empty.
//! - The token alphabet holds at least `MIN_ALPHABET_LENGTH` unique,
//!   non-whitespace ASCII characters.
//! - `min_length` never exceeds `MAX_TOKEN_MIN_LENGTH`.
//! - Configuration is read once and injected; nothing here reads globals
//!   after construction.

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default token alphabet, shared with the hashids family of encoders.
pub const DEFAULT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
/// Minimum number of unique characters a token alphabet must contain.
pub const MIN_ALPHABET_LENGTH: usize = 16;
/// Upper bound for the padded token length.
pub const MAX_TOKEN_MIN_LENGTH: usize = 64;

pub const ENV_SECRET_KEY: &str = "SOFTKEEP_SECRET_KEY";
pub const ENV_TOKEN_MIN_LENGTH: &str = "SOFTKEEP_TOKEN_MIN_LENGTH";
pub const ENV_TOKEN_ALPHABET: &str = "SOFTKEEP_TOKEN_ALPHABET";

/// Errors raised while building or validating codec configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Secret is missing or blank.
    EmptySecret,
    /// Alphabet has fewer unique characters than required.
    AlphabetTooShort { unique: usize, required: usize },
    /// Alphabet contains whitespace.
    AlphabetWhitespace,
    /// Alphabet contains non-ASCII characters.
    AlphabetNotAscii,
    /// Requested padding exceeds `MAX_TOKEN_MIN_LENGTH`.
    MinLengthTooLarge { value: usize, max: usize },
    /// A configuration value could not be parsed.
    InvalidValue { key: &'static str, value: String },
    /// The hashids builder rejected the options.
    Codec(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "codec secret key cannot be empty"),
            Self::AlphabetTooShort { unique, required } => write!(
                f,
                "token alphabet must contain at least {required} unique characters, got {unique}"
            ),
            Self::AlphabetWhitespace => write!(f, "token alphabet cannot contain whitespace"),
            Self::AlphabetNotAscii => write!(f, "token alphabet must be ASCII"),
            Self::MinLengthTooLarge { value, max } => {
                write!(f, "token min length {value} exceeds the maximum of {max}")
            }
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
            Self::Codec(message) => write!(f, "codec setup failed: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Options for the identifier codec.
///
/// The secret is the only required value. Rotating it invalidates every
/// token issued under the previous secret.
#[derive(Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub secret_key: String,
    /// Tokens shorter than this are padded. `0` disables padding.
    pub min_length: usize,
    pub alphabet: String,
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("secret_key", &"<redacted>")
            .field("min_length", &self.min_length)
            .field("alphabet", &self.alphabet)
            .finish()
    }
}

impl CodecConfig {
    /// Creates a configuration with the default alphabet and no padding.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            min_length: 0,
            alphabet: DEFAULT_ALPHABET.to_string(),
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_alphabet(mut self, alphabet: impl Into<String>) -> Self {
        self.alphabet = alphabet.into();
        self
    }

    /// Checks secret and alphabet rules.
    ///
    /// # Errors
    /// - `EmptySecret` when the secret is blank.
    /// - `AlphabetWhitespace` / `AlphabetNotAscii` / `AlphabetTooShort` for
    ///   unusable alphabets.
    /// - `MinLengthTooLarge` above `MAX_TOKEN_MIN_LENGTH`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.alphabet.chars().any(char::is_whitespace) {
            return Err(ConfigError::AlphabetWhitespace);
        }
        if !self.alphabet.is_ascii() {
            return Err(ConfigError::AlphabetNotAscii);
        }
        let unique = unique_char_count(&self.alphabet);
        if unique < MIN_ALPHABET_LENGTH {
            return Err(ConfigError::AlphabetTooShort {
                unique,
                required: MIN_ALPHABET_LENGTH,
            });
        }
        if self.min_length > MAX_TOKEN_MIN_LENGTH {
            return Err(ConfigError::MinLengthTooLarge {
                value: self.min_length,
                max: MAX_TOKEN_MIN_LENGTH,
            });
        }
        Ok(())
    }

    /// Reads configuration from process environment variables.
    ///
    /// See [`CodecConfig::from_lookup`] for the recognized keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Keys: `SOFTKEEP_SECRET_KEY` (required), `SOFTKEEP_TOKEN_MIN_LENGTH`,
    /// `SOFTKEEP_TOKEN_ALPHABET`. The result is validated before returning.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup(ENV_SECRET_KEY).ok_or(ConfigError::EmptySecret)?;
        let mut config = Self::new(secret_key);

        if let Some(raw) = lookup(ENV_TOKEN_MIN_LENGTH) {
            config.min_length =
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_TOKEN_MIN_LENGTH,
                        value: raw.clone(),
                    })?;
        }
        if let Some(alphabet) = lookup(ENV_TOKEN_ALPHABET) {
            config.alphabet = alphabet;
        }

        config.validate()?;
        Ok(config)
    }
}

fn unique_char_count(value: &str) -> usize {
    value.chars().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::{
        CodecConfig, ConfigError, ENV_SECRET_KEY, ENV_TOKEN_MIN_LENGTH, MAX_TOKEN_MIN_LENGTH,
    };
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn blank_secret_is_rejected() {
        assert_eq!(
            CodecConfig::new("   ").validate(),
            Err(ConfigError::EmptySecret)
        );
    }

    #[test]
    fn short_alphabet_is_rejected() {
        let err = CodecConfig::new("k")
            .with_alphabet("aabbccdd")
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::AlphabetTooShort {
                unique: 4,
                required: 16
            }
        );
    }

    #[test]
    fn lookup_reads_all_keys() {
        let config = CodecConfig::from_lookup(lookup_from(&[
            (ENV_SECRET_KEY, "s3cret"),
            (ENV_TOKEN_MIN_LENGTH, "8"),
        ]))
        .unwrap();
        assert_eq!(config.secret_key, "s3cret");
        assert_eq!(config.min_length, 8);
    }

    #[test]
    fn lookup_without_secret_fails() {
        let err = CodecConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::EmptySecret);
    }

    #[test]
    fn lookup_rejects_non_numeric_min_length() {
        let err = CodecConfig::from_lookup(lookup_from(&[
            (ENV_SECRET_KEY, "s3cret"),
            (ENV_TOKEN_MIN_LENGTH, "eight"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn oversized_min_length_is_rejected() {
        let err = CodecConfig::from_lookup(lookup_from(&[
            (ENV_SECRET_KEY, "s3cret"),
            (ENV_TOKEN_MIN_LENGTH, "1000000000000"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MinLengthTooLarge {
                value: 1_000_000_000_000,
                max: MAX_TOKEN_MIN_LENGTH
            }
        );
        assert!(CodecConfig::new("k")
            .with_min_length(MAX_TOKEN_MIN_LENGTH)
            .validate()
            .is_ok());
    }

    #[test]
    fn non_ascii_alphabet_is_rejected() {
        let err = CodecConfig::new("k")
            .with_alphabet("abcdefghijklmnopé")
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::AlphabetNotAscii);
    }

    #[test]
    fn unique_count_ignores_repeats() {
        assert_eq!(super::unique_char_count("aabbccdd"), 4);
        assert_eq!(super::unique_char_count(""), 0);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", CodecConfig::new("top-secret"));
        assert!(!rendered.contains("top-secret"));
    }
}
