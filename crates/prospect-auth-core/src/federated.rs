//! Federated identity providers (Google OAuth)

use async_trait::async_trait;
use prospect_types::{AuthProvider, FederatedProfile};
use serde::Deserialize;
use std::time::Duration;

use crate::AuthError;

/// Google OAuth consent endpoint
pub const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Google OAuth token endpoint
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Google userinfo endpoint
pub const GOOGLE_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Exchanges an authorization code for the caller's identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Which provider this is
    fn provider(&self) -> AuthProvider;

    /// Exchange an authorization code for a profile
    async fn exchange_code(&self, code: &str) -> Result<FederatedProfile, AuthError>;
}

/// Google OAuth client configuration
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleConfig {
    /// Create a config pointing at Google's production endpoints
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: GOOGLE_AUTH_ENDPOINT.to_string(),
            token_url: GOOGLE_TOKEN_ENDPOINT.to_string(),
            userinfo_url: GOOGLE_USERINFO_ENDPOINT.to_string(),
        }
    }

    /// Override token and userinfo endpoints (for testing)
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl From<UserInfo> for FederatedProfile {
    fn from(info: UserInfo) -> Self {
        Self {
            external_id: info.id,
            email: info.email,
            name: info.name,
            picture: info.picture,
        }
    }
}

/// Google authorization-code exchange client
#[derive(Clone, Debug)]
pub struct GoogleIdentityProvider {
    config: GoogleConfig,
    http_client: reqwest::Client,
}

impl GoogleIdentityProvider {
    /// Create a provider with a client tuned for short provider round trips
    pub fn new(config: GoogleConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(config, http_client)
    }

    /// Create a provider with a custom HTTP client
    pub fn with_client(config: GoogleConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// URL of the consent screen the user is redirected to
    pub fn authorization_url(&self) -> Result<String, AuthError> {
        let url = reqwest::Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::Configuration(format!("invalid Google auth url: {e}")))?;
        Ok(url.into())
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google token request failed: {}", e);
                AuthError::FederatedIdentity("token exchange failed".to_string())
            })?;

        let body: TokenResponse = response.json().await.map_err(|e| {
            tracing::warn!("Unreadable Google token response: {}", e);
            AuthError::FederatedIdentity("unreadable token response".to_string())
        })?;

        if let Some(error) = body.error {
            tracing::debug!(error = %error, "Google rejected the authorization code");
            return Err(AuthError::FederatedIdentity(
                body.error_description.unwrap_or(error),
            ));
        }

        body.access_token.ok_or_else(|| {
            AuthError::FederatedIdentity("no access token returned by Google".to_string())
        })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google userinfo request failed: {}", e);
                AuthError::FederatedIdentity("userinfo request failed".to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!("Google userinfo returned status: {}", response.status());
            return Err(AuthError::FederatedIdentity(
                "userinfo request was rejected".to_string(),
            ));
        }

        response.json::<UserInfo>().await.map_err(|e| {
            tracing::warn!("Unreadable Google userinfo: {}", e);
            AuthError::FederatedIdentity("unreadable userinfo response".to_string())
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Google
    }

    async fn exchange_code(&self, code: &str) -> Result<FederatedProfile, AuthError> {
        let access_token = self.fetch_access_token(code).await?;
        let info = self.fetch_userinfo(&access_token).await?;
        Ok(info.into())
    }
}
