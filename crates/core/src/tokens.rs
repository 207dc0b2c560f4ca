//! Random tokens, digests, and payment webhook signatures.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of passport submission link tokens.
pub const LINK_TOKEN_LENGTH: usize = 32;

/// Length of generated affiliate codes.
pub const AFFILIATE_CODE_LENGTH: usize = 8;

type HmacSha256 = Hmac<Sha256>;

/// Random alphanumeric string of `len` characters.
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Unguessable token for a public passport link.
pub fn generate_link_token() -> String {
    random_alphanumeric(LINK_TOKEN_LENGTH)
}

/// Uppercase affiliate code shared with customers (e.g. `K7Q2M9XA`).
pub fn generate_affiliate_code() -> String {
    random_alphanumeric(AFFILIATE_CODE_LENGTH).to_uppercase()
}

/// SHA-256 hex digest.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Hex HMAC-SHA256 of a payload.
pub fn compute_signature(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex HMAC-SHA256 signature.
pub fn verify_signature(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_tokens_are_random_alphanumeric() {
        let a = generate_link_token();
        let b = generate_link_token();
        assert_eq!(a.len(), LINK_TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn affiliate_code_is_uppercase() {
        let code = generate_affiliate_code();
        assert_eq!(code.len(), AFFILIATE_CODE_LENGTH);
        assert!(!code.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn signature_round_trip() {
        let sig = compute_signature("secret", b"{\"order_id\":1}");
        assert_eq!(sig.len(), 64);
        assert!(verify_signature("secret", b"{\"order_id\":1}", &sig));
        assert!(!verify_signature("other", b"{\"order_id\":1}", &sig));
        assert!(!verify_signature("secret", b"{\"order_id\":2}", &sig));
        assert!(!verify_signature("secret", b"{}", "not-hex"));
    }
}
