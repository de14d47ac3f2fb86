//! UseCase 層
//!
//! UI 層（WebSocket / HTTP ハンドラ）から呼ばれるアプリケーションロジック。
//! Domain 層の trait にのみ依存します。

mod connect_participant;
mod create_room;
mod disconnect_participant;
mod error;
mod get_rooms;
mod join_room;
mod leave_room;
mod send_message;

pub use connect_participant::ConnectParticipantUseCase;
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{CreateRoomError, GetRoomDetailError, JoinRoomError};
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase};
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use send_message::SendMessageUseCase;
