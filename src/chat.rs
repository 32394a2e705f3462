//! Sesión de chat: historial ordenado de mensajes que consume el selector de respuestas.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::{
    error::ChatError,
    models::{ChatMessage, Sender},
    responder,
};

pub const GREETING: &str = "Hello! I'm your FDA compliance assistant. I can help you with 510(k) submissions, biocompatibility requirements, substantial equivalence, and more. What would you like to know?";

/// Preguntas rápidas que el widget ofrece antes del primer mensaje.
pub const QUICK_QUESTIONS: [&str; 4] = [
    "What are the main 510(k) sections?",
    "What is substantial equivalence?",
    "Why do submissions get rejected?",
    "Biocompatibility requirements",
];

/// Aplica el límite de tamaño (en bytes) y rechaza texto en blanco.
/// Devuelve el texto tal cual: el recorte sólo sirve para detectar el blanco.
pub fn validate_message(text: &str, max_bytes: usize) -> Result<&str, ChatError> {
    if text.len() > max_bytes {
        return Err(ChatError::MessageTooLong {
            len: text.len(),
            max: max_bytes,
        });
    }
    if text.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    Ok(text)
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    messages: Vec<ChatMessage>,
    awaiting_reply: bool,
    turns: usize,
    last_active: Instant,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: vec![ChatMessage::new(1, GREETING, Sender::Bot)],
            awaiting_reply: false,
            turns: 0,
            last_active: Instant::now(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Una sesión con respuesta en curso nunca se considera inactiva.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        !self.awaiting_reply && now.saturating_duration_since(self.last_active) >= timeout
    }

    /// Registra el mensaje del usuario y deja la sesión esperando respuesta.
    /// No admite un segundo turno hasta que se cierre el anterior, ni más de
    /// `max_turns` turnos desde el último reinicio.
    pub fn begin_turn(&mut self, text: &str, max_turns: usize) -> Result<ChatMessage, ChatError> {
        if self.awaiting_reply {
            return Err(ChatError::ReplyPending);
        }
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.turns >= max_turns {
            return Err(ChatError::TurnLimitReached(max_turns));
        }
        let msg = self.push(text, Sender::User);
        self.turns += 1;
        self.awaiting_reply = true;
        Ok(msg)
    }

    /// Añade la respuesta del bot para `user_text` y libera la sesión.
    pub fn finish_turn(&mut self, user_text: &str) -> ChatMessage {
        let msg = self.push(responder::select_response(user_text), Sender::Bot);
        self.awaiting_reply = false;
        msg
    }

    /// Vuelve al estado inicial: sólo el saludo.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
        self.awaiting_reply = false;
        self.turns = 0;
        self.last_active = Instant::now();
    }

    fn push(&mut self, text: &str, sender: Sender) -> ChatMessage {
        let msg = ChatMessage::new(self.messages.len() as u64 + 1, text, sender);
        self.messages.push(msg.clone());
        self.last_active = Instant::now();
        msg
    }
}
