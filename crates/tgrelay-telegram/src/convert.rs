//! teloxide `Message` to pipeline `ChatMessage`.

use teloxide::types::Message;

use tgrelay_core::types::ChatMessage;

/// Convert an incoming update. Messages from bots, without a sender, or
/// without text are skipped.
pub fn inbound_message(msg: &Message) -> Option<ChatMessage> {
    let from = msg.from.as_ref()?;
    if from.is_bot {
        return None;
    }
    msg.text()?;
    Some(chat_message(msg))
}

/// Convert any message, including the bot's own sent messages.
pub fn chat_message(msg: &Message) -> ChatMessage {
    let (sender_id, sender_name) = match msg.from.as_ref() {
        Some(user) => (
            user.id.0 as i64,
            user.username.clone().unwrap_or_else(|| user.first_name.clone()),
        ),
        None => (0, String::new()),
    };

    ChatMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender_id,
        sender_name,
        text: msg.text().unwrap_or_default().to_string(),
        sent_at: msg.date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: serde_json::Value, text: Option<&str>) -> Message {
        let mut json = serde_json::json!({
            "message_id": 77,
            "date": 1_700_000_000,
            "chat": {"id": 555, "type": "private", "first_name": "Alice"},
            "from": from,
        });
        if let Some(text) = text {
            json["text"] = text.into();
        }
        serde_json::from_value(json).unwrap()
    }

    fn alice() -> serde_json::Value {
        serde_json::json!({"id": 42, "is_bot": false, "first_name": "Alice", "username": "alice"})
    }

    #[test]
    fn text_message_is_converted() {
        let msg = inbound_message(&message(alice(), Some("hello"))).unwrap();
        assert_eq!(msg.chat_id, 555);
        assert_eq!(msg.message_id, 77);
        assert_eq!(msg.sender_id, 42);
        assert_eq!(msg.sender_name, "alice");
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.sent_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn first_name_used_without_username() {
        let from = serde_json::json!({"id": 43, "is_bot": false, "first_name": "Bob"});
        let msg = inbound_message(&message(from, Some("hi"))).unwrap();
        assert_eq!(msg.sender_name, "Bob");
    }

    #[test]
    fn bot_messages_are_skipped() {
        let from = serde_json::json!({"id": 9000, "is_bot": true, "first_name": "Relay"});
        assert!(inbound_message(&message(from.clone(), Some("beep"))).is_none());
        // but the bot's own sent messages still convert
        assert_eq!(chat_message(&message(from, Some("beep"))).sender_id, 9000);
    }

    #[test]
    fn messages_without_text_are_skipped() {
        assert!(inbound_message(&message(alice(), None)).is_none());
    }
}
