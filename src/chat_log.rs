//! ChatLog (C4): bounded, persisted, time-ordered message sequence.
//!
//! Reused verbatim by both `GameRoom` (room chat) and `GlobalLobby` (global chat) per
//! spec §4.7 — identical persistence/broadcast semantics for both.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::protocol::messages::{ChatKind, ChatPayload};

/// A bounded ring of chat messages. Oldest entries are dropped once `capacity` is
/// exceeded; the owning actor persists the log after every `push`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    capacity: usize,
    messages: VecDeque<ChatPayload>,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: VecDeque::with_capacity(capacity.min(256)),
        }
    }

    pub fn push(&mut self, message: ChatPayload) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn history(&self) -> Vec<ChatPayload> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Pushes a system-authored entry (no `player_id`) and returns the stored payload so
    /// the caller can broadcast it alongside the room/lobby chat log update.
    pub fn system(
        &mut self,
        content: impl Into<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> ChatPayload {
        let payload = ChatPayload {
            id: crate::protocol::types::ChatMessageId::new(),
            player_id: None,
            display_name: "system".to_string(),
            content: content.into(),
            timestamp,
            kind: ChatKind::System,
        };
        self.push(payload.clone());
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{ChatMessageId, PlayerId};
    use chrono::Utc;

    fn message(content: &str) -> ChatPayload {
        ChatPayload {
            id: ChatMessageId::new(),
            player_id: Some(PlayerId::new()),
            display_name: "tester".to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            kind: ChatKind::User,
        }
    }

    #[test]
    fn push_beyond_capacity_drops_oldest() {
        let mut log = ChatLog::new(3);
        for i in 0..5 {
            log.push(message(&format!("msg{i}")));
        }
        let history = log.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "msg2");
        assert_eq!(history[2].content, "msg4");
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut log = ChatLog::new(100);
        log.push(message("first"));
        log.push(message("second"));
        let history = log.history();
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[test]
    fn system_message_has_no_player_id() {
        let mut log = ChatLog::new(10);
        log.system("game started", Utc::now());
        assert_eq!(log.history()[0].player_id, None);
    }
}
