//! Relay credentials and TURN credential derivation

use sha2::{Digest, Sha256};

/// Caller-supplied credentials for one relay session
///
/// Immutable for the lifetime of the session; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct RelayCredentials {
    /// Relay application id
    pub app_id: String,

    /// Channel token (the `key` field of discovery requests and the
    /// `channel_key` of the join message)
    pub token: String,

    /// Channel name to join
    pub channel_name: String,

    /// Numeric user id
    pub uid: u64,

    /// Optional string user id (defaults to the decimal form of `uid`)
    pub string_uid: Option<String>,
}

impl RelayCredentials {
    /// String user id, falling back to the decimal numeric id
    pub fn string_uid(&self) -> String {
        self.string_uid
            .clone()
            .unwrap_or_else(|| self.uid.to_string())
    }
}

/// A username/credential pair for TURN authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCredential {
    /// Decimal string form of the user id
    pub username: String,
    /// Lowercase-hex SHA-256 digest of the username
    pub credential: String,
}

/// Derive the TURN username/credential pair for a user id.
///
/// The relay expects the password to be the hex SHA-256 digest of the
/// decimal uid string (UTF-8 bytes). A non-numeric id is hashed as-is.
pub fn derive_turn_credential(uid: impl ToString) -> TurnCredential {
    let username = uid.to_string();
    let digest = Sha256::digest(username.as_bytes());
    TurnCredential {
        credential: hex::encode(digest),
        username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_known_digest() {
        // sha256("12345")
        let cred = derive_turn_credential(12345u64);
        assert_eq!(cred.username, "12345");
        assert_eq!(
            cred.credential,
            "5994471abb01112afcc18159f6cc74b4f511b99806da59b3caf5a9c173cacfc5"
        );
    }

    #[test]
    fn test_derive_string_uid() {
        // a non-numeric id is treated as already-a-string
        let cred = derive_turn_credential("client_21231");
        assert_eq!(cred.username, "client_21231");
        assert_eq!(cred.credential.len(), 64);
        assert!(cred.credential.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(cred.credential, cred.credential.to_lowercase());
    }

    #[test]
    fn test_string_uid_fallback() {
        let creds = RelayCredentials {
            app_id: "app".to_string(),
            token: "tok".to_string(),
            channel_name: "chan".to_string(),
            uid: 81260392,
            string_uid: None,
        };
        assert_eq!(creds.string_uid(), "81260392");
    }
}
