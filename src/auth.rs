//! Credential forwarding.
//!
//! Turns a username/password pair into a login call against the auth service
//! and bearer tokens into verification calls. Nothing is validated locally:
//! tokens are opaque and forwarded verbatim.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{AuthClient, Credentials, TokenResponse};
use crate::error::{AuthError, BackendError};

/// Identity the auth service bound to a verified token.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identity {
    pub user: Option<String>,
}

/// Forwards credentials and tokens to the auth service.
#[derive(Clone)]
pub struct CredentialForwarder {
    client: Arc<dyn AuthClient>,
}

impl CredentialForwarder {
    pub fn new(client: Arc<dyn AuthClient>) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token.
    ///
    /// Both fields must be non-empty; the auth service is not contacted
    /// otherwise. A 401 from the service becomes `InvalidCredentials`, every
    /// other failure `ServiceUnavailable`.
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenResponse, AuthError> {
        if !credentials.is_complete() {
            warn!("Login attempt with missing credentials");
            return Err(AuthError::MissingCredentials);
        }

        let username = credentials.username.as_str();
        info!(username = %username, "Login attempt");

        match self.client.login(credentials).await {
            Ok(token) => {
                info!(username = %username, "Successful login");
                Ok(token)
            }
            Err(BackendError::Status { status: 401, .. }) => {
                warn!(username = %username, "Failed login: invalid credentials");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                warn!(username = %username, error = %e, "Login failed: auth service error");
                Err(AuthError::ServiceUnavailable(e.to_string()))
            }
        }
    }

    /// Verify a token with the auth service.
    ///
    /// Any failure (rejection, timeout, malformed reply) collapses to
    /// `InvalidToken`.
    pub async fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::MissingToken),
        };

        match self.client.verify(token).await {
            Ok(reply) if reply.is_valid() => Ok(Identity { user: reply.user }),
            Ok(_) => {
                debug!("Auth service reported token as invalid");
                Err(AuthError::InvalidToken)
            }
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                Err(AuthError::InvalidToken)
            }
        }
    }
}
