//! Component custom id codec.
//!
//! Wire format: `<base_id>` or `<base_id>:<token>`, where the token is base64url (no padding)
//! and keys a payload in the [`PayloadStore`]. The base id is fixed per component definition;
//! every `attach` mints a fresh token.

use crate::constants::{MAX_CUSTOM_ID_LEN, TOKEN_BYTES, WIRE_SEPARATOR};
use crate::error::{BotResult, ConfigError};
use crate::services::cache::PayloadStore;
use crate::util::random_token;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// What a decoded custom id says about its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadState {
    /// No token in the id: the component never carried data.
    Absent,
    /// A token was present but its payload is gone (expired or unknown).
    Expired,
    Present(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub base_id: String,
    pub payload: PayloadState,
}

impl Decoded {
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.payload {
            PayloadState::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.payload().map(|v| serde_json::from_value(v.clone()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.payload, PayloadState::Expired)
    }
}

pub struct ComponentCodec {
    store: Arc<PayloadStore>,
    separator: char,
    max_len: usize,
    token_bytes: usize,
}

impl ComponentCodec {
    pub fn new(store: Arc<PayloadStore>) -> Self {
        Self {
            store,
            separator: WIRE_SEPARATOR,
            max_len: MAX_CUSTOM_ID_LEN,
            token_bytes: TOKEN_BYTES,
        }
    }

    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes.max(TOKEN_BYTES);
        self
    }

    pub fn store(&self) -> &Arc<PayloadStore> {
        &self.store
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Length of an encoded token (base64 without padding).
    pub fn token_len(&self) -> usize {
        (self.token_bytes * 8).div_ceil(6)
    }

    /// Base ids must be non-empty, free of the separator, and leave room for a token.
    pub fn validate_base_id(&self, base_id: &str) -> Result<(), ConfigError> {
        if base_id.is_empty() || base_id.contains(self.separator) {
            return Err(ConfigError::InvalidBaseId(base_id.to_string()));
        }
        let len = base_id.len() + 1 + self.token_len();
        if len > self.max_len {
            return Err(ConfigError::IdentifierTooLong {
                base_id: base_id.to_string(),
                len,
                max: self.max_len,
            });
        }
        Ok(())
    }

    /// Store `payload` under a fresh token and return `base_id:token`.
    pub async fn attach<T: Serialize + ?Sized>(
        &self,
        base_id: &str,
        payload: &T,
        ttl_minutes: Option<u32>,
    ) -> BotResult<String> {
        self.validate_base_id(base_id)?;
        let token = random_token(self.token_bytes);
        self.store.store(&token, payload, ttl_minutes).await?;
        Ok(format!("{base_id}{}{token}", self.separator))
    }

    /// Split on the last separator: `(base_id, Some(token))` or `(wire_id, None)`.
    pub fn split<'a>(&self, wire_id: &'a str) -> (&'a str, Option<&'a str>) {
        match wire_id.rsplit_once(self.separator) {
            Some((base, token)) => (base, Some(token)),
            None => (wire_id, None),
        }
    }

    pub async fn decode(&self, wire_id: &str) -> BotResult<Decoded> {
        let (base_id, token) = self.split(wire_id);
        let payload = match token {
            None => PayloadState::Absent,
            Some("") => PayloadState::Expired,
            Some(token) => match self.store.get(token).await? {
                Some(value) => PayloadState::Present(value),
                None => PayloadState::Expired,
            },
        };
        Ok(Decoded {
            base_id: base_id.to_string(),
            payload,
        })
    }
}
