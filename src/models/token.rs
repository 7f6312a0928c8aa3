use serde::{Deserialize, Serialize};

/// An access token and, when the server rotated it, a new refresh token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        TokenPair {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Body of `POST /auth/refresh`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response of `POST /auth/refresh`. Both fields are optional on the wire;
/// a response without an access token counts as a failed refresh.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshResponse {
    /// Returns the new pair, or `None` when no (non-empty) access token was issued.
    pub fn into_pair(self) -> Option<TokenPair> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        Some(TokenPair {
            access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_response_requires_access_token() {
        let empty: RefreshResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_pair().is_none());

        let blank: RefreshResponse = serde_json::from_str(r#"{"accessToken": ""}"#).unwrap();
        assert!(blank.into_pair().is_none());

        let rotated: RefreshResponse =
            serde_json::from_str(r#"{"accessToken": "a2", "refreshToken": "r2"}"#).unwrap();
        assert_eq!(
            rotated.into_pair(),
            Some(TokenPair::new("a2", Some("r2".to_string())))
        );
    }

    #[test]
    fn test_refresh_request_wire_shape() {
        let body = serde_json::to_value(RefreshRequest { refresh_token: "r1" }).unwrap();
        assert_eq!(body, serde_json::json!({"refreshToken": "r1"}));
    }
}
