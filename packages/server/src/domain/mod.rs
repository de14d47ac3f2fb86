//! Domain 層
//!
//! シグナリングサーバーのドメインモデルと、ドメイン層が必要とする
//! インターフェース（Repository, MessagePusher）を定義します。

pub mod entity;
pub mod error;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use entity::Room;
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use pusher::{MessagePusher, PusherChannel};
pub use repository::{RoomRepository, RoomUpsert};
pub use value_object::{ConnectionId, MessageContent, RoomId, Timestamp, UserId};
