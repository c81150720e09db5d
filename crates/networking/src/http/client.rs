//! four.meme HTTP client with wallet-signature authentication

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use fourmeme_core::{
    ApiEnvelope, Error, LoginRequest, NonceRequest, Result, TokenCreateData, TokenCreateRequest,
    TokenDetails, TokenUploadData, UserInfo, VerifyInfo,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT},
    multipart, Client,
};
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, error, instrument};

// Use a real browser User-Agent to avoid being blocked
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

const VERIFY_TYPE_LOGIN: &str = "LOGIN";
const NETWORK_CODE_BSC: &str = "BSC";
const WALLET_NAME: &str = "MetaMask";

/// Attempts × interval bound on token-address polling
const TOKEN_ADDRESS_MAX_ATTEMPTS: u32 = 30;
const TOKEN_ADDRESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// HTTP client for the four.meme API
///
/// Authenticates by signing a one-time nonce with the primary wallet and
/// then sends the issued `meme-web-access` token as both a header and a
/// cookie, the way the web app does.
pub struct MemeApiClient {
    http: Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl MemeApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            access_token: RwLock::new(None),
        }
    }

    /// Default headers for requests (mimics browser)
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));
        headers.insert(REFERER, HeaderValue::from_static("https://four.meme/"));
        headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
        headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
        headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));

        if let Some(token) = self.access_token() {
            if let Ok(value) = HeaderValue::from_str(&token) {
                headers.insert("meme-web-access", value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!(
                "meme-web-access={token}; user_token={token}"
            )) {
                headers.insert(COOKIE, value);
            }
        }

        headers
    }

    /// The current access token, if authenticated
    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Install a previously issued token (reconnect without re-signing)
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    fn require_auth(&self) -> Result<()> {
        if self.access_token().is_none() {
            return Err(Error::Auth("Not authenticated. Please login first.".into()));
        }
        Ok(())
    }

    /// Request a one-time nonce for the given address
    #[instrument(skip(self))]
    pub async fn generate_nonce(&self, address: &str) -> Result<String> {
        let url = format!("{}/private/user/nonce/generate", self.base_url);
        let request = NonceRequest {
            account_address: address.to_string(),
            verify_type: VERIFY_TYPE_LOGIN.to_string(),
            network_code: NETWORK_CODE_BSC.to_string(),
        };

        let envelope: ApiEnvelope<String> = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!("Nonce request failed: {e}");
                Error::Api(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| Error::InvalidData(e.to_string()))?;

        envelope.into_data("nonce generate")
    }

    /// Sign in by proving control of the wallet: fetch a nonce, sign it,
    /// and exchange the signature for an access token.
    #[instrument(skip(self, signer))]
    pub async fn login(&self, signer: &PrivateKeySigner) -> Result<String> {
        let address = signer.address().to_string();
        let nonce = self.generate_nonce(&address).await?;

        let message = format!("I am signing my one-time nonce: {nonce}");
        let signature = signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| Error::Auth(format!("failed to sign nonce: {e}")))?;
        let signature_hex = format!("0x{}", alloy::hex::encode(signature.as_bytes()));

        let request = LoginRequest {
            region: "WEB".to_string(),
            lang_type: "EN".to_string(),
            login_ip: String::new(),
            invite_code: String::new(),
            verify_info: VerifyInfo {
                address: address.clone(),
                network_code: NETWORK_CODE_BSC.to_string(),
                signature: signature_hex,
                verify_type: VERIFY_TYPE_LOGIN.to_string(),
            },
            wallet_name: WALLET_NAME.to_string(),
        };

        let url = format!("{}/private/user/login/dex", self.base_url);
        let envelope: ApiEnvelope<String> = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!("Login request failed: {e}");
                Error::Auth(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| Error::InvalidData(e.to_string()))?;

        let token = envelope.into_data("login")?;
        self.set_access_token(token.clone());
        debug!("Authenticated as {address}");
        Ok(token)
    }

    /// Fetch the authenticated user's profile
    #[instrument(skip(self))]
    pub async fn user_info(&self) -> Result<UserInfo> {
        self.require_auth()?;
        let url = format!("{}/private/user/info", self.base_url);

        let envelope: ApiEnvelope<UserInfo> = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!("User info request failed: {e}");
                Error::Api(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| Error::InvalidData(e.to_string()))?;

        envelope.into_data("user info")
    }

    /// Upload a logo image; returns the hosted URL
    #[instrument(skip(self))]
    pub async fn upload_image(&self, path: &Path) -> Result<String> {
        self.require_auth()?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::InvalidData(format!("image file {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("logo.png")
            .to_string();
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| Error::InvalidData(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/private/token/upload", self.base_url);
        let envelope: ApiEnvelope<TokenUploadData> = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .multipart(form)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!("Image upload failed: {e}");
                Error::Api(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| Error::InvalidData(e.to_string()))?;

        let data = envelope.into_data("image upload")?;
        debug!("Image uploaded: {}", data.url);
        Ok(data.url)
    }

    /// Create the token record; the response carries the encoded creation
    /// argument and signature for the on-chain factory call.
    #[instrument(skip(self, request), fields(token = %request.token_name))]
    pub async fn create_token(&self, request: &TokenCreateRequest) -> Result<TokenCreateData> {
        self.require_auth()?;
        let url = format!("{}/private/token/create", self.base_url);

        let envelope: ApiEnvelope<TokenCreateData> = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .json(request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!("Token create request failed: {e}");
                Error::Api(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| Error::InvalidData(e.to_string()))?;

        let data = envelope.into_data("token create")?;
        debug!("Token record created with id {}", data.token_id);
        Ok(data)
    }

    /// Fetch details for a created token
    #[instrument(skip(self))]
    pub async fn token_details(&self, token_id: i64) -> Result<TokenDetails> {
        self.require_auth()?;
        let url = format!("{}/private/token/details?id={token_id}", self.base_url);

        let envelope: ApiEnvelope<TokenDetails> = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                error!("Token details request failed: {e}");
                Error::Api(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| Error::InvalidData(e.to_string()))?;

        envelope.into_data("token details")
    }

    /// Poll token details until the deployed contract address shows up.
    ///
    /// Bounded: fixed attempt count at a fixed interval, then
    /// [`Error::TokenAddressTimeout`].
    #[instrument(skip(self))]
    pub async fn wait_for_token_address(&self, token_id: i64) -> Result<String> {
        for attempt in 1..=TOKEN_ADDRESS_MAX_ATTEMPTS {
            match self.token_details(token_id).await {
                Ok(details) => {
                    if let Some(address) = details.address.filter(|a| !a.is_empty()) {
                        debug!("Token {token_id} deployed at {address}");
                        return Ok(address);
                    }
                    debug!("Token {token_id} has no address yet (attempt {attempt})");
                }
                Err(e) => debug!("Token details attempt {attempt} failed: {e}"),
            }
            tokio::time::sleep(TOKEN_ADDRESS_POLL_INTERVAL).await;
        }

        Err(Error::TokenAddressTimeout {
            attempts: TOKEN_ADDRESS_MAX_ATTEMPTS,
        })
    }
}
