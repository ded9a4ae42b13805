//! Session lookup.
//!
//! A connection presents an opaque token; a [`SessionProvider`] turns it
//! into a [`PlayerId`] or refuses it.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::PlayerId;

/// Longest token [`OpenSessions`] accepts as an id.
pub const MAX_OPEN_TOKEN_LEN: usize = 64;

pub trait SessionProvider: Send + Sync {
    fn authenticate(&self, token: &[u8]) -> Option<PlayerId>;
}

/// Development mode: the token *is* the player id.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenSessions;

impl SessionProvider for OpenSessions {
    fn authenticate(&self, token: &[u8]) -> Option<PlayerId> {
        if token.is_empty() || token.len() > MAX_OPEN_TOKEN_LEN {
            return None;
        }
        let id = std::str::from_utf8(token).ok()?;
        if id.chars().any(char::is_control) {
            return None;
        }
        Some(PlayerId::new(id))
    }
}

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("failed to read sessions file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse sessions file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fixed token -> player table.
///
/// ```toml
/// [tokens]
/// "s3cr3t-token" = "alice"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenTable {
    #[serde(default)]
    tokens: HashMap<String, String>,
}

impl TokenTable {
    pub fn from_toml_str(text: &str) -> Result<Self, SessionFileError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SessionFileError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl SessionProvider for TokenTable {
    fn authenticate(&self, token: &[u8]) -> Option<PlayerId> {
        let token = std::str::from_utf8(token).ok()?;
        self.tokens.get(token).map(PlayerId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_sessions_use_the_token_as_id() {
        assert_eq!(
            OpenSessions.authenticate(b"alice"),
            Some(PlayerId::new("alice"))
        );
    }

    #[test]
    fn open_sessions_reject_unusable_tokens() {
        assert_eq!(OpenSessions.authenticate(b""), None);
        assert_eq!(OpenSessions.authenticate(&[0xff, 0xfe]), None);
        assert_eq!(OpenSessions.authenticate(b"bad\nid"), None);
        assert_eq!(OpenSessions.authenticate(&[b'a'; 65]), None);
        assert!(OpenSessions.authenticate(&[b'a'; 64]).is_some());
    }

    #[test]
    fn token_table_maps_known_tokens_only() {
        let table = TokenTable::from_toml_str(
            r#"
            [tokens]
            "tok-1" = "alice"
            "tok-2" = "bob"
            "#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.authenticate(b"tok-2"), Some(PlayerId::new("bob")));
        assert_eq!(table.authenticate(b"alice"), None);
    }

    #[test]
    fn malformed_token_file_is_an_error() {
        assert!(matches!(
            TokenTable::from_toml_str("[tokens]\nx = 3"),
            Err(SessionFileError::Parse(_))
        ));
    }
}
