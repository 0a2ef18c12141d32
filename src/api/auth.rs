use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{
    AccountDto, ApiError, ApiKeyResponse, ApiResponse, AppState, ChangePasswordRequest,
    LoginRequest, MessageResponse, UpdateProfileRequest,
};
use crate::db::User;
use crate::domain::SensitiveAction;
use crate::services::{AuthError, RegisterRequest};

const SESSION_USER_KEY: &str = "user_id";

/// The authenticated caller, inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
///
/// Blocked accounts are refused with 403 whichever way they authenticate.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, &headers, &session)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Inicia sesión para continuar"))?;

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Admin gate: role check plus a fresh `admin_access` verification when the
/// admin has two-factor enabled. Must run inside [`auth_middleware`].
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden(
            "Se requieren permisos de administrador",
        ));
    }

    state
        .security_service()
        .ensure_verified(&user, SensitiveAction::AdminAccess)
        .await?;

    Ok(next.run(request).await)
}

async fn resolve_user(
    state: &AppState,
    headers: &HeaderMap,
    session: &Session,
) -> Result<Option<User>, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await {
        match state.auth_service().active_user(user_id).await {
            Ok(user) => return Ok(Some(user)),
            Err(AuthError::UserNotFound) => {
                let _ = session.flush().await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(key) = extract_api_key(headers) {
        let user = state.auth_service().authenticate_api_key(&key).await?;
        if let Some(user) = user {
            if user.is_blocked {
                return Err(AuthError::Blocked(user.blocked_reason).into());
            }
            return Ok(Some(user));
        }
    }

    Ok(None)
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let user = state.auth_service().register(payload).await?;
    start_session(&session, user.id).await?;

    Ok(Json(ApiResponse::success(user.into())))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Correo y contraseña son obligatorios"));
    }

    let user = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;
    start_session(&session, user.id).await?;

    Ok(Json(ApiResponse::success(user.into())))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Sesión cerrada")))
}

/// GET /auth/me
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ApiResponse<AccountDto>> {
    Json(ApiResponse::success(user.into()))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Contraseña actualizada",
    ))))
}

/// POST /auth/api-key/regenerate
pub async fn regenerate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    let api_key = state.auth_service().regenerate_api_key(user.id).await?;
    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

/// PUT /profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let updated = state
        .auth_service()
        .update_profile(&user, &payload.name, payload.phone)
        .await?;

    Ok(Json(ApiResponse::success(updated.into())))
}

async fn start_session(session: &Session, user_id: i32) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_from_header_or_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123 "));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("abc123"));

        headers.insert("X-Api-Key", HeaderValue::from_static("xyz"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("xyz"));
    }
}
