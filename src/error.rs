/// Application Error Handling
///
/// One closed taxonomy for the whole service:
/// 1. Domain errors raised by the account and session core
/// 2. Infrastructure errors (database, email API, identity provider) carrying their source
/// 3. HTTP response mapping with a stable machine-readable code
/// 4. Structured error logging with context

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// ============================================================================
/// 1. INFRASTRUCTURE ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(&'static str),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(&'static str, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(&'static str, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(&'static str),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(&'static str),
    #[error("input contains potentially dangerous SQL patterns")]
    PossibleSQLInjection,
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database connection error")]
    ConnectionPool(#[source] sqlx::Error),
    #[error("query error")]
    QueryExecution(#[source] sqlx::Error),
}

/// Email service errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("failed to send email")]
    SendFailed(#[source] reqwest::Error),
    #[error("email service rejected the request")]
    Rejected(#[source] reqwest::Error),
    #[error("invalid email link: {0}")]
    InvalidLink(String),
}

/// Errors talking to the external identity provider
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("failed to exchange authorization code")]
    CodeExchange(#[source] reqwest::Error),
    #[error("failed to fetch user info")]
    UserInfo(#[source] reqwest::Error),
    #[error("identity provider returned an incomplete profile: {0}")]
    IncompleteProfile(&'static str),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    AlreadyExists(&'static str),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("this account uses {provider} login, please sign in with {provider}")]
    OAuthAccount { provider: String },
    #[error("email not verified, please check your email for verification link")]
    EmailNotVerified,
    #[error("email already verified")]
    EmailAlreadyVerified,
    #[error("invalid token")]
    InvalidToken,
    #[error("token has expired")]
    TokenExpired,
    #[error("token has been revoked")]
    TokenRevoked,
    #[error("invalid verification token")]
    InvalidVerificationToken,
    #[error("verification token has expired")]
    VerificationTokenExpired,
    #[error("invalid password reset token")]
    InvalidResetToken,
    #[error("password reset token has expired")]
    ResetTokenExpired,
    #[error("password hashing failed")]
    HashFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    IdentityProvider(#[from] OAuthError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code clients can switch on
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound("user") => "USER_NOT_FOUND",
            AppError::NotFound("refresh token") => "REFRESH_TOKEN_NOT_FOUND",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::OAuthAccount { .. } => "OAUTH_ACCOUNT",
            AppError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AppError::EmailAlreadyVerified => "EMAIL_ALREADY_VERIFIED",
            AppError::InvalidToken => "TOKEN_INVALID",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenRevoked => "TOKEN_REVOKED",
            AppError::InvalidVerificationToken => "INVALID_VERIFICATION_TOKEN",
            AppError::VerificationTokenExpired => "VERIFICATION_TOKEN_EXPIRED",
            AppError::InvalidResetToken => "INVALID_RESET_TOKEN",
            AppError::ResetTokenExpired => "RESET_TOKEN_EXPIRED",
            AppError::HashFailure(_) => "HASH_FAILURE",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(DatabaseError::ConnectionPool(_)) => "SERVICE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Email(_) => "EMAIL_SERVICE_ERROR",
            AppError::IdentityProvider(_) => "IDENTITY_PROVIDER_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to clients; infrastructure details stay in the logs
    fn public_message(&self) -> String {
        match self {
            AppError::HashFailure(_) | AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Database(DatabaseError::ConnectionPool(_)) => {
                "Database service temporarily unavailable".to_string()
            }
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Email(_) => "Email service temporarily unavailable".to_string(),
            AppError::IdentityProvider(_) => "Failed to authenticate with identity provider".to_string(),
            other => other.to_string(),
        }
    }

    fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AppError::HashFailure(_)
                | AppError::Database(_)
                | AppError::Email(_)
                | AppError::IdentityProvider(_)
                | AppError::Internal(_)
        )
    }

    /// Render the full `source()` chain for logging
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err))
            }
            other => AppError::Database(DatabaseError::QueryExecution(other)),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    pub fn log_error(&self, error_id: &str) {
        if self.is_server_fault() {
            tracing::error!(
                error_id = error_id,
                code = self.code(),
                error = %self.chain(),
                "Request failed"
            );
        } else {
            tracing::warn!(
                error_id = error_id,
                code = self.code(),
                error = %self,
                "Request rejected"
            );
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let status = self.status_code();
        let body = ErrorResponse::new(
            error_id,
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        );

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound("refresh token") => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::TokenRevoked
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::EmailNotVerified => StatusCode::FORBIDDEN,
            AppError::OAuthAccount { .. }
            | AppError::EmailAlreadyVerified
            | AppError::InvalidVerificationToken
            | AppError::InvalidResetToken
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::VerificationTokenExpired | AppError::ResetTokenExpired => StatusCode::GONE,
            AppError::Database(DatabaseError::ConnectionPool(_)) | AppError::Email(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::HashFailure(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
