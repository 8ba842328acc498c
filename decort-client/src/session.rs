//! Authenticated session
//!
//! The session is process-wide: every reconciliation shares one access token
//! and refreshes it through a single mutex, so concurrent handlers never
//! race two logins. Token acquisition itself is an injected capability
//! behind [`Authenticator`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::form::Form;
use crate::transport::Transport;

/// Safety margin subtracted from the token lifetime, so a token is refreshed
/// before it expires mid-flight.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_in(token: impl Into<String>, lifetime_secs: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(Utc::now() + Duration::seconds(lifetime_secs)),
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= at,
            None => false,
        }
    }
}

/// Credential exchange; injected by the host.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, transport: &dyn Transport) -> Result<AccessToken, ClientError>;
}

/// OAuth2 client-credentials exchange against the platform SSO application.
#[derive(Debug, Clone)]
pub struct OauthAuthenticator {
    sso_url: String,
    app_id: String,
    app_secret: String,
}

impl OauthAuthenticator {
    pub fn new(
        sso_url: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            sso_url: sso_url.into(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }
}

#[async_trait]
impl Authenticator for OauthAuthenticator {
    async fn login(&self, transport: &dyn Transport) -> Result<AccessToken, ClientError> {
        let url = format!("{}/v1/oauth/access_token", self.sso_url);
        let form = Form::new()
            .text("grant_type", "client_credentials")
            .text("client_id", self.app_id.clone())
            .text("client_secret", self.app_secret.clone())
            .text("response_type", "id_token");

        let response = transport.post_form(&url, None, &form).await?;
        if !response.is_success() {
            return Err(ClientError::Auth(format!(
                "sso returned {}: {}",
                response.status, response.body
            )));
        }
        // The SSO answers with the bare JWT as the response body.
        let token = response.body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(ClientError::Auth("sso returned an empty token".to_string()));
        }
        Ok(AccessToken::expiring_in(token, 3600))
    }
}

/// Shared token cell with serialized refresh.
pub struct Session {
    authenticator: Arc<dyn Authenticator>,
    token: Mutex<Option<AccessToken>>,
}

impl Session {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            token: Mutex::new(None),
        }
    }

    /// Current bearer token, logging in when there is none or it expired.
    pub async fn bearer(&self, transport: &dyn Transport) -> Result<String, ClientError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }
        let fresh = self.authenticator.login(transport).await?;
        let bearer = fresh.token.clone();
        *slot = Some(fresh);
        Ok(bearer)
    }

    /// Drop the cached token and log in again.
    ///
    /// Called after a 401: the platform may have invalidated the session
    /// server-side before the client-side expiry.
    pub async fn refresh(&self, transport: &dyn Transport) -> Result<String, ClientError> {
        let mut slot = self.token.lock().await;
        tracing::debug!("re-authenticating after rejected token");
        let fresh = self.authenticator.login(transport).await?;
        let bearer = fresh.token.clone();
        *slot = Some(fresh);
        Ok(bearer)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
