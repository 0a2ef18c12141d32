use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{parse_action, validate_code};
use super::{
    ApiError, ApiResponse, AppState, SendCodeRequest, UpdateTwoFactorRequest, VerifyCodeRequest,
};
use crate::domain::SensitiveAction;
use crate::services::{CodeDispatch, SecuritySettings, VerificationGrant};

/// GET /security/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<SecuritySettings>>, ApiError> {
    let settings = state.security_service().settings(user.id).await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// POST /security/send-code
pub async fn send_code(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<SendCodeRequest>,
) -> Result<Json<ApiResponse<CodeDispatch>>, ApiError> {
    let action = parse_action(&payload.action)?;
    if action == SensitiveAction::PasswordReset {
        return Err(ApiError::validation(
            "Usa /api/password-reset/request para recuperar tu contraseña",
        ));
    }

    let dispatch = state.security_service().send_code(user.id, action).await?;
    Ok(Json(ApiResponse::success(dispatch)))
}

/// POST /security/verify-code
pub async fn verify_code(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<ApiResponse<VerificationGrant>>, ApiError> {
    let action = parse_action(&payload.action)?;
    let code = validate_code(&payload.code)?;

    let grant = state
        .security_service()
        .verify_code(user.id, action, code)
        .await?;
    Ok(Json(ApiResponse::success(grant)))
}

/// POST /security/update-2fa
pub async fn update_two_factor(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateTwoFactorRequest>,
) -> Result<Json<ApiResponse<SecuritySettings>>, ApiError> {
    let method = payload.method.unwrap_or(user.two_factor_method);

    let settings = state
        .security_service()
        .update_two_factor_settings(user.id, payload.enabled, method)
        .await?;
    Ok(Json(ApiResponse::success(settings)))
}
