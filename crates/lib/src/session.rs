//! Backend session ids for chat messages.
//!
//! The NLU backend keeps multi-turn context per session id. The same user in the same channel
//! must map to the same id across turns, so the id is a hash of selected message properties.

use sha2::{Digest, Sha256};

use crate::message::Message;

/// Length of derived ids; v2 rejects session ids longer than 36 characters.
const SESSION_ID_LEN: usize = 32;

/// Unique session identifier (opaque string).
pub type SessionId = String;

/// Derive a stable session id from the given message properties (e.g. `["user", "channel"]`).
/// Properties without a value are skipped; if none has a value a random id is returned.
pub fn session_id_for(message: &Message, props: &[String]) -> SessionId {
    let mut hasher = Sha256::new();
    let mut used = 0;
    for prop in props {
        if let Some(v) = message.property(prop) {
            hasher.update(prop.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"\n");
            used += 1;
        }
    }
    if used == 0 {
        log::debug!("session: no id properties on message, using random session id");
        return uuid::Uuid::new_v4().simple().to_string();
    }
    let mut id = format!("{:x}", hasher.finalize());
    id.truncate(SESSION_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> Vec<String> {
        vec!["user".to_string(), "channel".to_string()]
    }

    #[test]
    fn same_user_and_channel_share_a_session() {
        let a = Message::new("direct_message", "pick an apple")
            .with_user("test_user")
            .with_channel("test_channel");
        let b = Message::new("direct_message", "two please")
            .with_user("test_user")
            .with_channel("test_channel");
        let id = session_id_for(&a, &props());
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert_eq!(id, session_id_for(&b, &props()));
    }

    #[test]
    fn different_channel_gets_a_different_session() {
        let a = Message::new("direct_message", "hi")
            .with_user("u")
            .with_channel("c1");
        let b = Message::new("direct_message", "hi")
            .with_user("u")
            .with_channel("c2");
        assert_ne!(session_id_for(&a, &props()), session_id_for(&b, &props()));
    }

    #[test]
    fn property_names_are_part_of_the_hash() {
        let a = Message::new("direct_message", "hi").with_user("x");
        let b = Message::new("direct_message", "hi").with_channel("x");
        assert_ne!(session_id_for(&a, &props()), session_id_for(&b, &props()));
    }

    #[test]
    fn no_properties_falls_back_to_random_ids() {
        let m = Message::new("direct_message", "hi");
        let a = session_id_for(&m, &props());
        let b = session_id_for(&m, &props());
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
