use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AdminError, AuthError, OrderError, SecurityError, TicketError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ExternalApiError { service: String, message: String },

    ValidationError(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),

    /// Any other variant with a machine-readable code for clients.
    Coded {
        code: &'static str,
        error: Box<ApiError>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::ExternalApiError { service, message } => {
                write!(f, "{service} error: {message}")
            }
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Coded { code, error } => write!(f, "{error} [{code}]"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error en la base de datos".to_string(),
                )
            }
            Self::ExternalApiError { service, message } => {
                tracing::warn!("{} error: {}", service, message);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("{service} no está disponible, intenta de nuevo"),
                )
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error interno".to_string(),
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::Coded { error, .. } => error.status_and_message(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status_and_message().0
    }

    #[must_use]
    pub fn with_code(self, code: Option<&'static str>) -> Self {
        match code {
            Some(code) => Self::Coded {
                code,
                error: Box::new(self),
            },
            None => self,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let mut body = ApiResponse::<()>::error(error_message);
        if let Self::Coded { code, .. } = &self {
            body = body.with_code(code);
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<SecurityError> for ApiError {
    fn from(err: SecurityError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let base = match err {
            SecurityError::CodeMismatch { .. }
            | SecurityError::CodeExpired
            | SecurityError::NoPendingCode
            | SecurityError::TooManyAttempts => Self::Unauthorized(message),
            SecurityError::VerificationRequired(_) => Self::Forbidden(message),
            SecurityError::ChannelUnavailable | SecurityError::Validation(_) => {
                Self::ValidationError(message)
            }
            SecurityError::ChannelDelivery(detail) => Self::ExternalApiError {
                service: "El servicio de notificaciones".to_string(),
                message: detail,
            },
            SecurityError::UserNotFound => Self::NotFound(message),
            SecurityError::Database(e) => Self::DatabaseError(e),
            SecurityError::Internal(e) => Self::InternalError(e),
        };
        base.with_code(code)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let base = match err {
            AuthError::Security(e) => return e.into(),
            AuthError::InvalidCredentials => Self::Unauthorized(message),
            AuthError::Blocked(_) => Self::Forbidden(message),
            AuthError::EmailTaken => Self::Conflict(message),
            AuthError::UserNotFound => Self::Unauthorized(message),
            AuthError::Validation(_) => Self::ValidationError(message),
            AuthError::Database(e) => Self::DatabaseError(e),
            AuthError::Internal(e) => Self::InternalError(e),
        };
        base.with_code(code)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let base = match err {
            OrderError::Security(e) => return e.into(),
            OrderError::NotFound => Self::NotFound(message),
            OrderError::ProductUnavailable
            | OrderError::MissingAmountFields
            | OrderError::Validation(_) => Self::ValidationError(message),
            OrderError::InsufficientStock { .. }
            | OrderError::QuoteMismatch { .. }
            | OrderError::InvalidTransferState(_)
            | OrderError::InvalidTransition(_)
            | OrderError::Conflict => Self::Conflict(message),
            OrderError::Database(e) => Self::DatabaseError(e),
            OrderError::Internal(e) => Self::InternalError(e),
        };
        base.with_code(code)
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let base = match err {
            TicketError::NotFound => Self::NotFound(message),
            TicketError::Closed(_)
            | TicketError::InvalidTransition { .. }
            | TicketError::Conflict => Self::Conflict(message),
            TicketError::Validation(_) => Self::ValidationError(message),
            TicketError::Database(e) => Self::DatabaseError(e),
            TicketError::Internal(e) => Self::InternalError(e),
        };
        base.with_code(code)
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let base = match err {
            AdminError::Security(e) => return e.into(),
            AdminError::NotFound(_) => Self::NotFound(message),
            AdminError::DuplicateGateway(_) => Self::Conflict(message),
            AdminError::Validation(_) | AdminError::Settings(_) => Self::ValidationError(message),
            AdminError::Database(e) => Self::DatabaseError(e),
            AdminError::Internal(e) => Self::InternalError(e),
        };
        base.with_code(code)
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} no encontrado"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentStatus, SensitiveAction};

    #[test]
    fn verification_failures_are_unauthorized_with_code() {
        let err = ApiError::from(SecurityError::CodeMismatch { attempts_left: 3 });
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(matches!(err, ApiError::Coded { code: "CODE_MISMATCH", .. }));
    }

    #[test]
    fn missing_grant_is_forbidden() {
        let err = ApiError::from(OrderError::Security(SecurityError::VerificationRequired(
            SensitiveAction::HighValueOrder,
        )));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(matches!(err, ApiError::Coded { code: "VERIFICATION_REQUIRED", .. }));
    }

    #[test]
    fn transfer_state_errors_conflict() {
        let err = ApiError::from(OrderError::InvalidTransferState(PaymentStatus::Verified));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn delivery_failures_are_bad_gateway() {
        let err = ApiError::from(SecurityError::ChannelDelivery("timeout".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_details_are_hidden() {
        let (status, message) =
            ApiError::InternalError("db path /var/x".to_string()).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("/var/x"));
    }
}
