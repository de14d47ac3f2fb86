//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use tsunagi_shared::protocol::{CreateChatRequest, CreateChatResponse};

use crate::{
    domain::UserId,
    infrastructure::dto::http::RoomDto,
    ui::state::AppState,
    usecase::GetRoomDetailError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

fn failure(status: StatusCode, error: String) -> (StatusCode, Json<CreateChatResponse>) {
    (
        status,
        Json(CreateChatResponse {
            success: false,
            room_id: None,
            error: Some(error),
        }),
    )
}

/// Stateless room creation, used by clients when the WebSocket path fails
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateChatRequest>,
) -> (StatusCode, Json<CreateChatResponse>) {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if !state.is_authorized(authorization, None) {
        tracing::warn!("Rejected unauthorized room creation for '{}'", body.user_id);
        return failure(StatusCode::UNAUTHORIZED, "unauthorized".to_string());
    }

    // Convert String -> UserId (Domain Model)
    let (user_id, target_id) = match (
        UserId::try_from(body.user_id),
        UserId::try_from(body.target_id),
    ) {
        (Ok(user_id), Ok(target_id)) => (user_id, target_id),
        (Err(e), _) | (_, Err(e)) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.create_room_usecase.execute(user_id, target_id).await {
        Ok(upsert) => (
            StatusCode::OK,
            Json(CreateChatResponse {
                success: true,
                room_id: Some(upsert.room.id.into_string()),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to create room over HTTP: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomDto>> {
    let rooms = state.get_rooms_usecase.execute().await;

    // Domain Model から DTO への変換
    Json(rooms.into_iter().map(RoomDto::from).collect())
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDto>, StatusCode> {
    match state.get_room_detail_usecase.execute(room_id).await {
        Ok(room) => Ok(Json(room.into())),
        Err(GetRoomDetailError::RoomNotFound) => Err(StatusCode::NOT_FOUND),
        Err(GetRoomDetailError::RepositoryError) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
