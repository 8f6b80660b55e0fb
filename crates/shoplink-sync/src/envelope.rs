//! # Response Envelope
//!
//! Every marketplace response, token or open API, arrives wrapped in the
//! same envelope:
//!
//! ```text
//! { "code": 0, "message": "Success", "request_id": "2023...", "data": { ... } }
//! ```
//!
//! Decoding the envelope and interpreting its code are two separate steps:
//! [`Envelope::decode`] only parses JSON, [`Envelope::into_data`] applies the
//! success rule (`code == 0`) and the auth-code classification.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};

/// Typed response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub request_id: Option<String>,

    /// Absent on most error responses.
    pub data: Option<T>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Parses a response body. A body that is not an envelope is a
    /// transport failure.
    pub fn decode(body: &str) -> SyncResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| SyncError::transport(format!("malformed response envelope: {}", e)))
    }
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Converts a non-success envelope into its error.
    ///
    /// Codes listed in `auth_codes` mean the access token was rejected.
    pub fn to_error(&self, auth_codes: &[i64]) -> SyncError {
        if auth_codes.contains(&self.code) {
            SyncError::AuthRejected {
                code: Some(self.code),
                message: self.message.clone(),
            }
        } else {
            SyncError::Provider {
                code: self.code,
                message: self.message.clone(),
                request_id: self.request_id.clone(),
            }
        }
    }

    /// Yields the payload of a successful envelope.
    pub fn into_data(self, auth_codes: &[i64]) -> SyncResult<T> {
        if !self.is_success() {
            return Err(self.to_error(auth_codes));
        }
        self.data
            .ok_or_else(|| SyncError::transport("successful response carried no data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    const AUTH: &[i64] = &[105002];

    #[test]
    fn test_success_yields_data() {
        let env: Envelope<Payload> =
            Envelope::decode(r#"{"code":0,"message":"Success","data":{"value":7}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.into_data(AUTH).unwrap(), Payload { value: 7 });
    }

    #[test]
    fn test_nonzero_code_is_provider_error() {
        let env: Envelope<Payload> = Envelope::decode(
            r#"{"code":36009003,"message":"shop not found","request_id":"r1","data":null}"#,
        )
        .unwrap();

        match env.into_data(AUTH).unwrap_err() {
            SyncError::Provider {
                code,
                message,
                request_id,
            } => {
                assert_eq!(code, 36009003);
                assert_eq!(message, "shop not found");
                assert_eq!(request_id.as_deref(), Some("r1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_auth_code_is_auth_rejected() {
        let env: Envelope<Payload> =
            Envelope::decode(r#"{"code":105002,"message":"access token expired"}"#).unwrap();
        assert!(env.into_data(AUTH).unwrap_err().is_auth_rejected());
    }

    #[test]
    fn test_missing_data_and_garbage_are_transport_errors() {
        let env: Envelope<Payload> = Envelope::decode(r#"{"code":0}"#).unwrap();
        assert!(matches!(env.into_data(AUTH), Err(SyncError::Transport(_))));

        let err = Envelope::<Payload>::decode("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
