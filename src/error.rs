use axum::http::StatusCode;
use thiserror::Error;

/// Errors from calls to a collaborator service (auth or image backend)
#[derive(Debug, Error)]
pub enum BackendError {
    /// Collaborator answered with a non-success HTTP status
    #[error("Collaborator returned HTTP {status}")]
    Status {
        status: u16,
        /// `detail` field of the collaborator's error body, if any
        detail: Option<String>,
    },

    /// Call did not complete within its timeout
    #[error("Collaborator request timed out")]
    Timeout,

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Collaborator answered 2xx with a body we could not interpret
    #[error("Unexpected collaborator response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// HTTP status reported by the collaborator, when it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BackendError::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }

    /// Collaborator-provided error detail, when present.
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            BackendError::Connection(err.to_string())
        }
    }
}

/// Outcomes of the credential forwarder
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password missing from the request body
    #[error("Username and password required")]
    MissingCredentials,

    /// Auth service rejected the credentials
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Auth service could not be reached or answered unexpectedly
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),

    /// No Authorization header on a protected route
    #[error("Missing authorization token")]
    MissingToken,

    /// Token verification failed for any reason
    #[error("Invalid token")]
    InvalidToken,
}

/// Errors raised while relaying an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("No file uploaded")]
    MissingFile,

    #[error("Only one file may be uploaded per request")]
    MultipleFiles,

    /// Malformed multipart body
    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    /// Writing or reading the staged temporary file failed
    #[error("Failed to stage upload: {0}")]
    Staging(#[from] std::io::Error),

    /// Image service rejected or failed the upload
    #[error("Failed to upload image: {0}")]
    Backend(#[from] BackendError),
}

/// Errors from the user store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint on the username was violated
    #[error("Username already exists")]
    Conflict,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Conflict,
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Errors from user registration
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Username and password required")]
    MissingCredentials,

    #[error("User already exists")]
    UserExists,

    /// No user store configured (missing DATABASE_URL)
    #[error("User store is not configured")]
    StoreUnavailable,

    #[error("User store error: {0}")]
    Store(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Caller-facing error taxonomy.
///
/// Every component error converts into one of these; the HTTP mapping lives
/// in `server::handlers`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required body field or multipart part missing (400)
    #[error("{0}")]
    MissingCredential(String),

    /// Authorization header missing (401)
    #[error("Missing authorization token")]
    MissingToken,

    /// Login rejected by the auth service (401)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token rejected or unverifiable (401)
    #[error("{0}")]
    InvalidToken(String),

    /// Conflicting resource, e.g. duplicate username (409)
    #[error("{0}")]
    Conflict(String),

    /// Collaborator failure; status is passed through when known, else 500
    #[error("{message}")]
    CollaboratorUnavailable {
        status: Option<StatusCode>,
        message: String,
    },

    /// Catch-all (500); `path` is echoed back by the last-resort handler
    #[error("{message}")]
    Internal {
        message: String,
        path: Option<String>,
    },
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            path: None,
        }
    }

    /// Map a collaborator failure, preferring the collaborator's own status
    /// and `detail` text over `fallback`.
    pub fn from_backend(err: &BackendError, fallback: &str) -> Self {
        ApiError::CollaboratorUnavailable {
            status: err.status(),
            message: err.detail().unwrap_or(fallback).to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::MissingCredential(err.to_string()),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::ServiceUnavailable(_) => ApiError::CollaboratorUnavailable {
                status: None,
                message: "Auth service unavailable".to_string(),
            },
            AuthError::MissingToken => ApiError::MissingToken,
            AuthError::InvalidToken => ApiError::InvalidToken("Invalid token".to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingToken => ApiError::MissingToken,
            UploadError::MissingFile | UploadError::MultipleFiles | UploadError::Multipart(_) => {
                ApiError::MissingCredential(err.to_string())
            }
            UploadError::Staging(_) => ApiError::internal("Failed to upload image"),
            UploadError::Backend(ref backend) => {
                ApiError::from_backend(backend, "Failed to upload image")
            }
        }
    }
}

impl From<RegisterError> for ApiError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::MissingCredentials => ApiError::MissingCredential(err.to_string()),
            RegisterError::UserExists => ApiError::Conflict(err.to_string()),
            RegisterError::StoreUnavailable
            | RegisterError::Store(_)
            | RegisterError::Hashing(_) => ApiError::internal("Internal server error"),
        }
    }
}
