//! Message formatting utilities for client display.

use tsunagi_shared::time::timestamp_to_rfc3339;

use crate::{
    connection::{ConnectionState, ConnectionStatus, Termination},
    coordinator::CreateRoomOutcome,
};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `from` - The user ID of the sender
    /// * `content` - The message content
    /// * `sent_at` - Unix timestamp when the message was sent (milliseconds)
    pub fn format_chat_message(from: &str, content: &str, sent_at: i64) -> String {
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            from,
            content,
            timestamp_to_rfc3339(sent_at)
        )
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("sent at {}\n", timestamp_to_rfc3339(sent_at))
    }

    /// Format the result of opening a room
    pub fn format_room_ready(outcome: &CreateRoomOutcome) -> String {
        let mut output = String::new();
        output.push_str("\n============================================================\n");
        output.push_str(&format!(
            "Room {} with {}\n",
            outcome.room_id, outcome.target_id
        ));
        if !outcome.confirmed {
            output.push_str("(offline: the server has not confirmed this room yet)\n");
        }
        if let Some(note) = &outcome.note {
            output.push_str(&format!("note: {}\n", note));
        }
        output.push_str("============================================================\n");
        output
    }

    /// Format a connection status change. `None` for changes not worth showing.
    pub fn format_status(status: &ConnectionStatus) -> Option<String> {
        match (status.state, status.termination) {
            (ConnectionState::Connected, _) => Some("\n* connected\n".to_string()),
            (ConnectionState::Connecting, _) if status.reconnect_attempt > 0 => Some(format!(
                "\n* connection lost, reconnecting (attempt {})\n",
                status.reconnect_attempt
            )),
            (ConnectionState::Idle, Some(Termination::RetriesExhausted)) => {
                Some("\n* can't connect: the server is unreachable\n".to_string())
            }
            (ConnectionState::Idle, Some(Termination::AuthRejected)) => {
                Some("\n* can't connect: please sign in again\n".to_string())
            }
            _ => None,
        }
    }
}
