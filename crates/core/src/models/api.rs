//! four.meme API request/response types
//!
//! Every endpoint wraps its payload in `{code, msg, data}`; `code != 0`
//! means the request failed at the application level.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Standard four.meme response envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning a non-zero `code` into an API error.
    pub fn into_data(self, context: &str) -> Result<T> {
        if self.code != 0 {
            return Err(Error::Api(format!(
                "{context}: {}",
                self.msg.unwrap_or_else(|| format!("code {}", self.code))
            )));
        }
        self.data
            .ok_or_else(|| Error::Api(format!("{context}: empty response data")))
    }
}

/// Request body for nonce generation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    pub account_address: String,
    pub verify_type: String,
    pub network_code: String,
}

/// Signed-nonce proof included in the login request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInfo {
    pub address: String,
    pub network_code: String,
    pub signature: String,
    pub verify_type: String,
}

/// Request body for login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub region: String,
    pub lang_type: String,
    pub login_ip: String,
    pub invite_code: String,
    pub verify_info: VerifyInfo,
    pub wallet_name: String,
}

/// Authenticated user info
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: i64,
    pub address: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Payload of a successful image upload
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUploadData {
    pub url: String,
}

/// Request body for token creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreateRequest {
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    pub total_supply: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tg_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_link: Option<String>,
    pub logo_url: String,
}

/// Payload of a successful token creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreateData {
    pub token_id: i64,
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub sale_amount: Option<String>,
    /// Encoded createToken argument, hex
    pub create_arg: String,
    /// Creation signature, hex
    pub signature: String,
    /// Deployed address, when already known
    #[serde(default)]
    pub token_address: Option<String>,
}

/// Token details payload (polled until `address` is populated)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetails {
    pub id: i64,
    #[serde(default)]
    pub address: Option<String>,
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_unwraps_success() {
        let env: ApiEnvelope<TokenUploadData> =
            serde_json::from_str(r#"{"code":0,"msg":"ok","data":{"url":"https://x/y.png"}}"#)
                .unwrap();
        assert_eq!(env.into_data("upload").unwrap().url, "https://x/y.png");
    }

    #[test]
    fn envelope_surfaces_api_errors() {
        let env: ApiEnvelope<TokenUploadData> =
            serde_json::from_str(r#"{"code":5,"msg":"bad image"}"#).unwrap();
        let err = env.into_data("upload").unwrap_err();
        assert!(err.to_string().contains("bad image"));
    }

    #[test]
    fn create_request_uses_api_field_names() {
        let req = TokenCreateRequest {
            token_name: "Test".into(),
            token_symbol: "TST".into(),
            decimals: 18,
            total_supply: "1000000000".into(),
            description: "d".into(),
            tg_link: None,
            x_link: Some("https://x.com/test".into()),
            website_link: None,
            logo_url: "https://x/y.png".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tokenName").is_some());
        assert!(json.get("xLink").is_some());
        assert!(json.get("tgLink").is_none());
    }
}
