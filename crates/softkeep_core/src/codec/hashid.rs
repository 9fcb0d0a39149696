//! Record id codec on top of the `harsh` hashids implementation.
//!
//! `harsh` owns the token algorithm. This layer adds record-id policy:
//! positive ids only, one value per token, canonical spelling only.

use super::TokenError;
use crate::config::{CodecConfig, ConfigError};
use crate::model::record::RecordId;
use harsh::Harsh;
use std::fmt::{Debug, Formatter};

/// Bidirectional id <-> token codec keyed by a secret.
pub struct IdCodec {
    harsh: Harsh,
    alphabet: Vec<char>,
    min_length: usize,
    /// Length of the longest token any valid record id can produce.
    max_token_len: usize,
}

impl Debug for IdCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCodec")
            .field("min_length", &self.min_length)
            .field("alphabet_len", &self.alphabet.len())
            .finish_non_exhaustive()
    }
}

impl IdCodec {
    /// Builds a codec from validated configuration.
    ///
    /// # Errors
    /// - Configuration validation errors unchanged.
    /// - `Codec` when the hashids builder rejects the options.
    pub fn new(config: &CodecConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let harsh = Harsh::builder()
            .salt(config.secret_key.as_bytes())
            .alphabet(config.alphabet.as_bytes())
            .length(config.min_length)
            .build()
            .map_err(|err| ConfigError::Codec(format!("{err:?}")))?;
        let longest = harsh.encode(&[RecordId::MAX.unsigned_abs()]).len();

        Ok(Self {
            harsh,
            alphabet: config.alphabet.chars().collect(),
            min_length: config.min_length,
            max_token_len: longest.max(config.min_length),
        })
    }

    /// Encodes a positive id into its opaque token.
    ///
    /// Returns `None` for `id <= 0`; such ids are never assigned by the store.
    pub fn encode(&self, id: RecordId) -> Option<String> {
        if id <= 0 {
            return None;
        }
        Some(self.harsh.encode(&[id.unsigned_abs()]))
    }

    /// Decodes a token, yielding `None` for anything `encode` did not produce.
    pub fn decode(&self, token: &str) -> Option<RecordId> {
        self.try_decode(token).ok()
    }

    /// Decodes a token and reports why it was rejected.
    pub fn try_decode(&self, token: &str) -> Result<RecordId, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        if token.chars().any(|ch| !self.alphabet.contains(&ch)) {
            return Err(TokenError::ForeignCharacter);
        }
        // Longer bodies cannot hold an id and may overflow while unhashing.
        if token.len() > self.max_token_len {
            return Err(TokenError::Overflow);
        }

        let values = self
            .harsh
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        let value = match values.as_slice() {
            [value] => *value,
            _ => return Err(TokenError::Malformed),
        };
        let id = RecordId::try_from(value).map_err(|_| TokenError::Overflow)?;

        match self.encode(id) {
            Some(expected) if expected == token => Ok(id),
            _ => Err(TokenError::Mismatch),
        }
    }
}
