//! Modelos de dominio del chat (mensajes y su autor).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Autor de un mensaje dentro de una sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Un mensaje del historial. Inmutable una vez creado.
/// `id` es la posición (desde 1) que ocupaba en el historial al crearse.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: u64, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_sender_in_lowercase() {
        let msg = ChatMessage::new(3, "hola", Sender::Bot);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["sender"], "bot");
        assert_eq!(value["text"], "hola");
        assert!(value["timestamp"].is_string());
    }
}
