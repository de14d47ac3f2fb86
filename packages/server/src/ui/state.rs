//! Server state shared by all handlers.

use std::sync::Arc;

use crate::domain::MessagePusher;
use crate::usecase::{
    ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
    GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase,
};

/// Shared application state
pub struct AppState {
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
    /// Direct replies (acks, kicks) bypass the usecases
    pub message_pusher: Arc<dyn MessagePusher>,
    /// Bearer token required from clients. `None` disables the check.
    pub auth_token: Option<String>,
}

impl AppState {
    /// Check the bearer token of a request against the configured token.
    ///
    /// Browsers cannot set headers on a WebSocket upgrade, so a `token` query
    /// parameter is accepted as well.
    pub fn is_authorized(&self, authorization: Option<&str>, query_token: Option<&str>) -> bool {
        let Some(expected) = self.auth_token.as_deref() else {
            return true;
        };
        let bearer = authorization.and_then(|value| value.strip_prefix("Bearer "));
        bearer == Some(expected) || query_token == Some(expected)
    }
}
