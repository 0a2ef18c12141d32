use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, TicketListQuery};
use crate::db::{Ticket, TicketMessage};
use crate::services::{CreateTicketRequest, PostMessageRequest, TicketThread};

/// GET /support/tickets
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<TicketListQuery>,
) -> Result<Json<ApiResponse<Vec<Ticket>>>, ApiError> {
    let tickets = state
        .ticket_service()
        .list_tickets(&user, query.status)
        .await?;
    Ok(Json(ApiResponse::success(tickets)))
}

/// POST /support/tickets
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<Json<ApiResponse<TicketThread>>, ApiError> {
    let thread = state.ticket_service().create_ticket(&user, payload).await?;
    Ok(Json(ApiResponse::success(thread)))
}

/// GET /support/tickets/{id}
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TicketThread>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    let thread = state.ticket_service().get_ticket(&user, id).await?;
    Ok(Json(ApiResponse::success(thread)))
}

/// POST /support/tickets/{id}/messages
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<Json<ApiResponse<TicketMessage>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    let message = state
        .ticket_service()
        .post_message(&user, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(message)))
}
