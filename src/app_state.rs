use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    chat::{self, ChatSession},
    config::AppConfig,
    error::ChatError,
    models::ChatMessage,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let sessions = SessionStore::new(config.max_sessions)
            .with_idle_timeout(config.session_idle_timeout)
            .with_max_turns(config.max_turns_per_session);
        Self { config, sessions }
    }
}

/// Mensajes producidos por un turno completo.
#[derive(Debug, Clone)]
pub struct Turn {
    pub user: ChatMessage,
    pub bot: ChatMessage,
}

/// Registro de sesiones abiertas, compartido entre handlers.
///
/// El mutex nunca se mantiene a través de un `.await`: la pausa del bot
/// ocurre entre dos secciones críticas cortas.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, ChatSession>>>,
    capacity: usize,
    idle_timeout: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        let defaults = AppConfig::default();
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
            idle_timeout: defaults.session_idle_timeout,
            max_turns: defaults.max_turns_per_session,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, ChatSession>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Abre una sesión nueva y devuelve su id y el historial inicial.
    /// Si el registro está lleno, antes descarta las sesiones inactivas.
    pub fn create(&self) -> Result<(Uuid, Vec<ChatMessage>), ChatError> {
        let mut sessions = self.lock();
        if sessions.len() >= self.capacity {
            let evicted = evict_idle(&mut sessions, self.idle_timeout);
            if evicted > 0 {
                debug!("{} sesiones inactivas descartadas al crear una nueva", evicted);
            }
        }
        if sessions.len() >= self.capacity {
            return Err(ChatError::TooManySessions(self.capacity));
        }
        let session = ChatSession::new();
        let id = session.id;
        let messages = session.messages().to_vec();
        sessions.insert(id, session);
        debug!("Sesión de chat {} creada ({} abiertas)", id, sessions.len());
        Ok((id, messages))
    }

    pub fn messages(&self, id: Uuid) -> Result<Vec<ChatMessage>, ChatError> {
        self.lock()
            .get(&id)
            .map(|s| s.messages().to_vec())
            .ok_or(ChatError::SessionNotFound(id))
    }

    /// Reinicia el historial. No se permite mientras hay una respuesta en curso.
    pub fn reset(&self, id: Uuid) -> Result<Vec<ChatMessage>, ChatError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(ChatError::SessionNotFound(id))?;
        if session.is_awaiting_reply() {
            return Err(ChatError::ReplyPending);
        }
        session.reset();
        Ok(session.messages().to_vec())
    }

    pub fn remove(&self, id: Uuid) -> Result<(), ChatError> {
        match self.lock().remove(&id) {
            Some(_) => {
                debug!("Sesión de chat {} cerrada", id);
                Ok(())
            }
            None => Err(ChatError::SessionNotFound(id)),
        }
    }

    /// Descarta las sesiones sin actividad desde hace `idle_timeout`.
    pub fn evict_idle(&self) -> usize {
        evict_idle(&mut self.lock(), self.idle_timeout)
    }

    /// Tarea de fondo que barre las sesiones inactivas cada `every`.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle();
                if evicted > 0 {
                    info!("{} sesiones de chat inactivas descartadas", evicted);
                }
            }
        })
    }

    /// Turno completo: mensaje del usuario, pausa de `delay` y respuesta del bot.
    ///
    /// La pausa y la respuesta corren en una tarea aparte: si quien llama
    /// abandona el futuro (cliente desconectado), el turno se cierra igualmente.
    pub async fn submit(
        &self,
        id: Uuid,
        text: &str,
        max_bytes: usize,
        delay: Duration,
    ) -> Result<Turn, ChatError> {
        let text = chat::validate_message(text, max_bytes)?;

        let user = {
            let mut sessions = self.lock();
            let session = sessions.get_mut(&id).ok_or(ChatError::SessionNotFound(id))?;
            session.begin_turn(text, self.max_turns)?
        };

        let store = self.clone();
        let user_text = user.text.clone();
        let reply = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            // La sesión puede haberse cerrado durante la pausa.
            let mut sessions = store.lock();
            let session = sessions.get_mut(&id).ok_or(ChatError::SessionNotFound(id))?;
            Ok::<_, ChatError>(session.finish_turn(&user_text))
        });

        let bot = reply.await.map_err(|e| {
            warn!("La tarea de respuesta de la sesión {} terminó mal: {}", id, e);
            ChatError::ReplyInterrupted
        })??;

        Ok(Turn { user, bot })
    }
}

fn evict_idle(sessions: &mut HashMap<Uuid, ChatSession>, timeout: Duration) -> usize {
    let now = Instant::now();
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_idle(now, timeout));
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use crate::responder;

    #[tokio::test]
    async fn submit_appends_a_turn() {
        let store = SessionStore::new(4);
        let (id, initial) = store.create().unwrap();
        assert_eq!(initial.len(), 1);

        let turn = store
            .submit(id, "How long is the review?", 4096, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(turn.user.sender, Sender::User);
        assert_eq!(turn.bot.text, responder::select_response("How long is the review?"));
        assert_eq!(store.messages(id).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let store = SessionStore::new(4);
        let id = Uuid::new_v4();
        assert!(matches!(
            store.submit(id, "cost", 4096, Duration::ZERO).await,
            Err(ChatError::SessionNotFound(missing)) if missing == id
        ));
        assert!(matches!(store.messages(id), Err(ChatError::SessionNotFound(_))));
        assert!(matches!(store.remove(id), Err(ChatError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn overlapping_submit_is_rejected_while_reply_pending() {
        let store = SessionStore::new(4);
        let (id, _) = store.create().unwrap();

        let slow = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .submit(id, "cost", 4096, Duration::from_millis(200))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(
            store.submit(id, "timeline", 4096, Duration::ZERO).await,
            Err(ChatError::ReplyPending)
        ));
        assert!(matches!(store.reset(id), Err(ChatError::ReplyPending)));

        slow.await.unwrap().unwrap();
        assert_eq!(store.messages(id).unwrap().len(), 3);
    }

    #[test]
    fn capacity_is_enforced() {
        let store = SessionStore::new(2);
        store.create().unwrap();
        let (second, _) = store.create().unwrap();
        assert!(matches!(store.create(), Err(ChatError::TooManySessions(2))));
        store.remove(second).unwrap();
        assert!(store.create().is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn reset_restores_greeting() {
        let store = SessionStore::new(2);
        let (id, _) = store.create().unwrap();
        tokio_test::block_on(store.submit(id, "fail", 4096, Duration::ZERO)).unwrap();
        let messages = store.reset(id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, crate::chat::GREETING);
    }

    #[test]
    fn sessions_are_independent() {
        let store = SessionStore::new(8);
        let (a, _) = store.create().unwrap();
        let (b, _) = store.create().unwrap();

        let results = tokio_test::block_on(futures::future::join_all([
            store.submit(a, "price?", 4096, Duration::from_millis(10)),
            store.submit(b, "predicate device", 4096, Duration::from_millis(10)),
        ]));
        assert!(results.iter().all(Result::is_ok));

        assert_eq!(store.messages(a).unwrap()[2].text, responder::select_response("price?"));
        assert_eq!(
            store.messages(b).unwrap()[2].text,
            responder::select_response("predicate device")
        );
    }

    #[tokio::test]
    async fn dropped_submit_still_closes_the_turn() {
        let store = SessionStore::new(4);
        let (id, _) = store.create().unwrap();

        let slow = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .submit(id, "cost", 4096, Duration::from_millis(200))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        slow.abort();
        assert!(slow.await.unwrap_err().is_cancelled());

        // La respuesta llega aunque nadie la espere.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let log = store.messages(id).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2].text, responder::select_response("cost"));

        let turn = store
            .submit(id, "timeline", 4096, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(turn.bot.id, 5);
        assert_eq!(store.reset(id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn turn_cap_applies_per_session() {
        let store = SessionStore::new(4).with_max_turns(1);
        let (id, _) = store.create().unwrap();
        store.submit(id, "cost", 4096, Duration::ZERO).await.unwrap();
        assert!(matches!(
            store.submit(id, "timeline", 4096, Duration::ZERO).await,
            Err(ChatError::TurnLimitReached(1))
        ));
        assert_eq!(store.messages(id).unwrap().len(), 3);

        store.reset(id).unwrap();
        assert!(store.submit(id, "timeline", 4096, Duration::ZERO).await.is_ok());
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let store = SessionStore::new(8).with_idle_timeout(Duration::from_millis(20));
        let (stale, _) = store.create().unwrap();
        std::thread::sleep(Duration::from_millis(40));
        let (fresh, _) = store.create().unwrap();

        assert_eq!(store.evict_idle(), 1);
        assert!(matches!(store.messages(stale), Err(ChatError::SessionNotFound(_))));
        assert!(store.messages(fresh).is_ok());
    }

    #[test]
    fn full_store_makes_room_by_evicting_idle_sessions() {
        let store = SessionStore::new(2).with_idle_timeout(Duration::from_millis(20));
        store.create().unwrap();
        store.create().unwrap();
        assert!(matches!(store.create(), Err(ChatError::TooManySessions(2))));

        std::thread::sleep(Duration::from_millis(40));
        assert!(store.create().is_ok());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn sweeper_removes_abandoned_sessions() {
        let store = SessionStore::new(8).with_idle_timeout(Duration::from_millis(20));
        store.create().unwrap();
        let sweeper = store.spawn_sweeper(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.len(), 0);
        sweeper.abort();
    }
}
