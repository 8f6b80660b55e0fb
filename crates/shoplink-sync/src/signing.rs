//! # Request Signing
//!
//! Every open API call carries a `sign` query parameter computed from the
//! request itself.
//!
//! ## Signature Input
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  path        /product/202309/products/search                            │
//! │  query       app_key=K  page_size=20  shop_cipher=C  timestamp=T        │
//! │              (sign and access_token are never part of the input)       │
//! │  body        {}                                                         │
//! │                                                                         │
//! │  canonical = path + "app_key" + K + "page_size" + "20"                 │
//! │                   + "shop_cipher" + C + "timestamp" + T + body          │
//! │                                                                         │
//! │  sign = hex( HMAC-SHA256( key = secret,                                │
//! │                           msg = secret + canonical + secret ) )        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are concatenated in ascending byte order, so the same request always
//! produces the same signature. GET requests sign an empty body.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::{SyncError, SyncResult};

type HmacSha256 = Hmac<Sha256>;

/// Query keys that never take part in the signature.
pub const EXCLUDED_KEYS: &[&str] = &["sign", "access_token"];

/// Builds the string that gets wrapped in the secret and hashed.
pub fn canonical_string(path: &str, query: &BTreeMap<String, String>, body: &str) -> String {
    let mut canonical = String::with_capacity(path.len() + body.len() + query.len() * 24);
    canonical.push_str(path);
    for (key, value) in query {
        if EXCLUDED_KEYS.contains(&key.as_str()) {
            continue;
        }
        canonical.push_str(key);
        canonical.push_str(value);
    }
    canonical.push_str(body);
    canonical
}

/// Computes the lower-case hex signature for one request.
///
/// ```rust
/// use shoplink_sync::signing::sign;
/// use std::collections::BTreeMap;
///
/// let mut query = BTreeMap::new();
/// query.insert("app_key".to_string(), "k".to_string());
/// query.insert("timestamp".to_string(), "1700000000".to_string());
///
/// let a = sign("/authorization/202309/shops", &query, "", "s3cret").unwrap();
/// let b = sign("/authorization/202309/shops", &query, "", "s3cret").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn sign(
    path: &str,
    query: &BTreeMap<String, String>,
    body: &str,
    secret: &str,
) -> SyncResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SyncError::config(format!("app secret unusable as HMAC key: {}", e)))?;

    mac.update(secret.as_bytes());
    mac.update(canonical_string(path, query, body).as_bytes());
    mac.update(secret.as_bytes());

    Ok(to_hex(&mac.finalize().into_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_orders_keys_and_skips_excluded() {
        let q = query(&[
            ("timestamp", "1700000000"),
            ("app_key", "K"),
            ("sign", "old"),
            ("access_token", "tok"),
            ("shop_cipher", "C"),
        ]);
        assert_eq!(
            canonical_string("/p", &q, "{}"),
            "/papp_keyKshop_cipherCtimestamp1700000000{}"
        );
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let q = query(&[("app_key", "K"), ("timestamp", "1")]);
        let a = sign("/p", &q, "", "secret").unwrap();
        let b = sign("/p", &q, "", "secret").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_signature_ignores_sign_and_access_token() {
        let base = query(&[("app_key", "K"), ("timestamp", "1")]);
        let mut noisy = base.clone();
        noisy.insert("sign".into(), "whatever".into());
        noisy.insert("access_token".into(), "tok".into());

        assert_eq!(
            sign("/p", &base, "", "secret").unwrap(),
            sign("/p", &noisy, "", "secret").unwrap()
        );
    }

    #[test]
    fn test_signature_changes_with_inputs() {
        let q1 = query(&[("app_key", "K"), ("timestamp", "1")]);
        let q2 = query(&[("app_key", "K"), ("timestamp", "2")]);
        let s1 = sign("/p", &q1, "", "secret").unwrap();

        assert_ne!(s1, sign("/p", &q2, "", "secret").unwrap());
        assert_ne!(s1, sign("/p", &q1, "{}", "secret").unwrap());
        assert_ne!(s1, sign("/q", &q1, "", "secret").unwrap());
        assert_ne!(s1, sign("/p", &q1, "", "other").unwrap());
    }

    #[test]
    fn test_secret_wraps_canonical_string() {
        // HMAC-SHA256(key="s", msg="s" + "/pakv" + "s")
        let q = query(&[("a", "kv")]);
        let canonical = canonical_string("/p", &q, "");
        assert_eq!(canonical, "/pakv");

        let mut mac = HmacSha256::new_from_slice(b"s").unwrap();
        mac.update(b"s/pakvs");
        let expected = to_hex(&mac.finalize().into_bytes());
        assert_eq!(sign("/p", &q, "", "s").unwrap(), expected);
    }
}
