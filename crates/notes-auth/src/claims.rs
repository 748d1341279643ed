//! Read-only view of JWT access token claims
//!
//! The API issues HS256 JWTs. The client cannot verify the signature and
//! does not try to: claims are decoded for display (`status` output) only.
//! Expiry is still detected reactively from a 401, never from `exp`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Claims the API puts in its tokens.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: Option<String>,
    /// Expiry, unix seconds
    pub exp: Option<u64>,
    /// "access" or "refresh"
    #[serde(rename = "type")]
    pub token_type: Option<String>,
}

impl Claims {
    /// Whether `exp` lies at or before `now` (unix seconds). Tokens
    /// without `exp` never report expiry.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

/// Decode the payload segment of a JWT. Returns `None` for anything that
/// is not a three-segment token with a JSON payload.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decodes_access_token_claims() {
        let token = token_with_payload(r#"{"sub":"65f0c2","exp":1700000000,"type":"access"}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("65f0c2"));
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.token_type.as_deref(), Some("access"));
    }

    #[test]
    fn expiry_comparison() {
        let claims = decode_claims(&token_with_payload(r#"{"exp":100}"#)).unwrap();
        assert!(!claims.is_expired_at(99));
        assert!(claims.is_expired_at(100));
        assert!(claims.is_expired_at(101));
    }

    #[test]
    fn missing_exp_never_expires() {
        let claims = decode_claims(&token_with_payload(r#"{"sub":"u"}"#)).unwrap();
        assert!(!claims.is_expired_at(u64::MAX));
    }

    #[test]
    fn opaque_tokens_yield_none() {
        assert!(decode_claims("at_opaque").is_none());
        assert!(decode_claims("a.b").is_none());
        assert!(decode_claims("a.b.c.d").is_none());
        assert!(decode_claims("a.!!!.c").is_none());
    }
}
