//! Session token codec
//!
//! Tokens are compact signed strings carrying a resource reference and
//! an absolute expiry: `base64url(claims)--hex(hmac_sha256(claims))`.
//! Verification treats anything malformed, tampered with, or expired as
//! plain invalidity - never as an error the caller has to handle.

use crate::ResourceRef;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Process-wide HMAC signing key, explicitly constructed and passed
/// down to the codec. Rotation is out of scope.
pub struct SigningKey {
    secret: SecretString,
}

impl SigningKey {
    /// Create a signing key from configured secret material
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
        }
    }

    /// Generate a random key. Tokens signed with it die with the
    /// process, so this is only suitable for development setups.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self::new(hex::encode(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

/// What is inside a token
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "type")]
    type_: String,
    id: String,
    #[serde(rename = "validUntil")]
    valid_until: i64,
}

/// A freshly minted token plus its expiry (epoch seconds)
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    #[serde(rename = "validUntil")]
    pub valid_until: i64,
}

/// A token that passed signature and expiry checks
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub resource: ResourceRef,
    pub valid_until: i64,
}

/// Signs and verifies session tokens
pub struct TokenCodec {
    key: SigningKey,
}

impl TokenCodec {
    /// Create a codec around the given signing key
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Encode a resource reference and expiry into a signed token.
    ///
    /// `ttl_secs` may be negative to mint an already-expired token;
    /// expiry is only enforced at verification time.
    pub fn create_token(&self, resource: &ResourceRef, ttl_secs: i64) -> IssuedToken {
        let valid_until = Utc::now().timestamp() + ttl_secs;
        let claims = Claims {
            type_: resource.type_.clone(),
            id: resource.id.clone(),
            valid_until,
        };
        let payload = serde_json::to_string(&claims).expect("claims serialize");
        let signature = self.sign(payload.as_bytes());
        IssuedToken {
            token: format!(
                "{}--{}",
                URL_SAFE_NO_PAD.encode(&payload),
                hex::encode(signature)
            ),
            valid_until,
        }
    }

    /// Verify a token, returning `None` on a bad signature, malformed
    /// input, or an expiry at or before now. Never panics on garbage.
    pub fn verify_token(&self, token: &str) -> Option<VerifiedToken> {
        let (payload_b64, signature_hex) = token.split_once("--")?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let signature = hex::decode(signature_hex).ok()?;

        let expected = self.sign(&payload);
        if !bool::from(expected.as_slice().ct_eq(&signature)) {
            return None;
        }

        let claims: Claims = serde_json::from_slice(&payload).ok()?;
        if claims.valid_until <= Utc::now().timestamp() {
            return None;
        }
        Some(VerifiedToken {
            resource: ResourceRef::new(claims.type_, claims.id),
            valid_until: claims.valid_until,
        })
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(SigningKey::new("test-signing-secret"))
    }

    #[test]
    fn test_round_trip() {
        let c = codec();
        let resource = ResourceRef::new("test-users", "quint");
        let issued = c.create_token(&resource, 30);
        let verified = c.verify_token(&issued.token).unwrap();
        assert_eq!(verified.resource, resource);
        assert_eq!(verified.valid_until, issued.valid_until);
    }

    #[test]
    fn test_expired_token_rejected() {
        let c = codec();
        let issued = c.create_token(&ResourceRef::new("test-users", "42"), -30);
        assert!(c.verify_token(&issued.token).is_none());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let c = codec();
        let issued = c.create_token(&ResourceRef::new("test-users", "42"), 0);
        assert!(c.verify_token(&issued.token).is_none());
    }

    #[test]
    fn test_garbage_is_invalid_not_a_panic() {
        let c = codec();
        for garbage in ["", "xxx--yyy--zzz", "--", "a--", "--b", "no separators", "£€--ß"] {
            assert!(c.verify_token(garbage).is_none(), "accepted {:?}", garbage);
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let c = codec();
        let issued = c.create_token(&ResourceRef::new("test-users", "quint"), 30);
        let (payload, signature) = issued.token.split_once("--").unwrap();
        let forged_claims = r#"{"type":"test-users","id":"arthur","validUntil":9999999999}"#;
        let forged = format!("{}--{}", URL_SAFE_NO_PAD.encode(forged_claims), signature);
        assert!(c.verify_token(&forged).is_none());
        // and an intact payload with a truncated signature
        let truncated = format!("{}--{}", payload, &signature[..signature.len() - 2]);
        assert!(c.verify_token(&truncated).is_none());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuer = TokenCodec::new(SigningKey::new("secret-a"));
        let verifier = TokenCodec::new(SigningKey::new("secret-b"));
        let issued = issuer.create_token(&ResourceRef::new("test-users", "quint"), 30);
        assert!(verifier.verify_token(&issued.token).is_none());
    }

    #[test]
    fn test_numeric_looking_ids_survive() {
        let c = codec();
        let issued = c.create_token(&ResourceRef::new("test-users", "42"), 30);
        let verified = c.verify_token(&issued.token).unwrap();
        assert_eq!(verified.resource.id, "42");
    }
}
