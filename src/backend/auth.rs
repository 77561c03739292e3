//! HTTP implementation of [`AuthClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::{check_status, endpoint, AuthClient, Credentials, TokenResponse, VerifyResponse};
use crate::error::BackendError;

/// Auth service client backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpAuthClient {
    client: reqwest::Client,
    base_url: String,
    login_timeout: Duration,
    verify_timeout: Duration,
}

impl HttpAuthClient {
    /// # Arguments
    /// * `client` - Shared HTTP client (connection pool)
    /// * `base_url` - Auth service base URL, e.g. `http://auth-service:8080`
    /// * `login_timeout` - Timeout for `POST /login`
    /// * `verify_timeout` - Timeout for `GET /verify`
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        login_timeout: Duration,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            login_timeout,
            verify_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AuthClient for HttpAuthClient {
    async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, BackendError> {
        let url = endpoint(&self.base_url, "/login");
        debug!(url = %url, username = %credentials.username, "Forwarding login");

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .timeout(self.login_timeout)
            .send()
            .await?;

        let token = check_status(response).await?.json::<TokenResponse>().await?;
        Ok(token)
    }

    async fn verify(&self, token: &str) -> Result<VerifyResponse, BackendError> {
        let url = endpoint(&self.base_url, "/verify");

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, token)
            .timeout(self.verify_timeout)
            .send()
            .await?;

        let verified = check_status(response)
            .await?
            .json::<VerifyResponse>()
            .await?;
        Ok(verified)
    }
}
