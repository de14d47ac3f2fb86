//! Dependency wiring.

use std::sync::Arc;

use tsunagi_shared::time::{Clock, SystemClock};

use crate::{
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::state::AppState,
    usecase::{
        ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
        GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase,
        SendMessageUseCase,
    },
};

/// Build the application state backed by in-memory storage.
///
/// `auth_token` is the bearer token clients must present; `None` accepts everyone.
pub fn build_in_memory_state(auth_token: Option<String>) -> AppState {
    // Initialize dependencies in order:
    // 1. Repository
    // 2. MessagePusher
    // 3. UseCases
    let repository = Arc::new(InMemoryRoomRepository::new());
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    AppState {
        connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
            message_pusher.clone(),
        )),
        disconnect_participant_usecase: Arc::new(DisconnectParticipantUseCase::new(
            message_pusher.clone(),
        )),
        create_room_usecase: Arc::new(CreateRoomUseCase::new(repository.clone(), clock.clone())),
        join_room_usecase: Arc::new(JoinRoomUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            clock.clone(),
        )),
        leave_room_usecase: Arc::new(LeaveRoomUseCase::new(message_pusher.clone())),
        send_message_usecase: Arc::new(SendMessageUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            clock,
        )),
        get_rooms_usecase: Arc::new(GetRoomsUseCase::new(repository.clone())),
        get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(repository)),
        message_pusher,
        auth_token,
    }
}
