//! Canonical room identity for two-party chats.
//!
//! Both participants derive the same room id independently, so no handshake is
//! needed before either side asks the server for the room.

/// Prefix of every two-party room id.
pub const ROOM_ID_PREFIX: &str = "chat_";

/// Resolve the canonical room id for a pair of participants.
///
/// The two ids are ordered lexicographically and joined as
/// `chat_<smaller>_<larger>`, so `resolve_room_id(a, b) == resolve_room_id(b, a)`.
/// Empty ids are a caller contract violation and are not handled specially.
///
/// # Examples
///
/// ```
/// use tsunagi_shared::room::resolve_room_id;
///
/// assert_eq!(resolve_room_id("bob", "alice"), "chat_alice_bob");
/// ```
pub fn resolve_room_id(id_a: &str, id_b: &str) -> String {
    let (first, second) = if id_a <= id_b {
        (id_a, id_b)
    } else {
        (id_b, id_a)
    };
    format!("{ROOM_ID_PREFIX}{first}_{second}")
}
