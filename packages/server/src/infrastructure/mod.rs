//! Infrastructure 層
//!
//! Domain 層が定義する trait の具体的な実装と、外部とやり取りする DTO を提供します。

pub mod dto;
pub mod message_pusher;
pub mod repository;
