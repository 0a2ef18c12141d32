use axum::{Json, extract::State};
use std::sync::Arc;

use super::validation::validate_code;
use super::{
    ApiError, ApiResponse, AppState, MessageResponse, PasswordResetConfirm, PasswordResetRequest,
};
use crate::domain::TwoFactorMethod;

/// POST /password-reset/request
///
/// Answers the same way whether or not the identifier matches an account.
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.identifier.trim().is_empty() {
        return Err(ApiError::validation("Indica tu correo o teléfono"));
    }

    state
        .auth_service()
        .request_password_reset(
            &payload.identifier,
            payload.method.unwrap_or(TwoFactorMethod::EMAIL),
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Si la cuenta existe, enviamos un código de recuperación",
    ))))
}

/// POST /password-reset/confirm
pub async fn confirm_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let code = validate_code(&payload.code)?;

    state
        .auth_service()
        .confirm_password_reset(&payload.identifier, code, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Contraseña actualizada, ya puedes iniciar sesión",
    ))))
}
