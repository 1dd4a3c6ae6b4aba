//! Unified error handling for the service.
//!
//! Domain-specific error enums keep each subsystem's failure modes typed;
//! everything converges on [`AppError`], which maps to an HTTP response with
//! a structured JSON body and a stable machine-readable code.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Authentication and authorization errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidCredentials,
    TokenInvalid,
    TokenExpired,
    TokenKindMismatch { expected: &'static str },
    Forbidden,
    AccountPending,
    AccountRejected,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenKindMismatch { expected } => {
                write!(f, "Invalid token type, expected {}", expected)
            }
            AuthError::Forbidden => write!(f, "Admins only"),
            AuthError::AccountPending => write!(f, "Your account is under review"),
            AuthError::AccountRejected => write!(f, "Your account has been rejected"),
        }
    }
}

impl StdError for AuthError {}

/// Account moderation errors
#[derive(Debug)]
pub enum LifecycleError {
    AccountNotFound,
    InvalidState,
    InvalidDocument(String),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::AccountNotFound => write!(f, "Account not found"),
            LifecycleError::InvalidState => write!(f, "Account is not in pending status"),
            LifecycleError::InvalidDocument(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for LifecycleError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    Lifecycle(LifecycleError),
    RateLimited { max_per_minute: u32 },
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Lifecycle(e) => write!(f, "{}", e),
            AppError::RateLimited { max_per_minute } => {
                write!(f, "Rate limit exceeded: max {} requests per minute", max_per_minute)
            }
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::Lifecycle(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Database(DatabaseError::UniqueConstraintViolation(
                "email already registered".to_string(),
            ))
        } else if error_msg.contains("no rows") {
            AppError::Database(DatabaseError::NotFound("record not found".to_string()))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

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
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ENTRY")
                }
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DatabaseError::ConnectionPool(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
                }
                DatabaseError::UnexpectedError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
                }
            },

            AppError::Auth(e) => match e {
                AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN"),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
                }
                AuthError::TokenInvalid => (StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
                AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
                AuthError::TokenKindMismatch { .. } => {
                    (StatusCode::UNAUTHORIZED, "TOKEN_KIND_MISMATCH")
                }
                AuthError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                AuthError::AccountPending => (StatusCode::FORBIDDEN, "ACCOUNT_PENDING"),
                AuthError::AccountRejected => (StatusCode::FORBIDDEN, "ACCOUNT_REJECTED"),
            },

            AppError::Lifecycle(e) => match e {
                LifecycleError::AccountNotFound => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
                LifecycleError::InvalidState => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
                LifecycleError::InvalidDocument(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_DOCUMENT")
                }
            },

            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),

            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// External message. Server-side failures are not echoed verbatim to callers.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(DatabaseError::ConnectionPool(_)) => {
                "Service temporarily unavailable".to_string()
            }
            AppError::Database(DatabaseError::UnexpectedError(_)) => {
                "Database error occurred".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(error_id = error_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Database(e) => {
                tracing::error!(error_id = error_id, error = %e, "Database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::Lifecycle(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Lifecycle error");
            }
            AppError::RateLimited { .. } => {
                tracing::warn!(error_id = error_id, error = %self, "Rate limit exceeded");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code) = self.status_and_code();
        let body = ErrorResponse::new(
            error_id,
            self.public_message(),
            code.to_string(),
            status.as_u16(),
        );

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }
}
