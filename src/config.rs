//! Carga y gestión de configuración del servidor de chat.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

const DEFAULT_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Orígenes aceptados por la capa CORS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::Any);
        }
        let origins: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() {
            return Err(anyhow!("ALLOWED_ORIGINS no contiene ningún origen"));
        }
        Ok(Self::List(origins))
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    /// Pausa artificial antes de la respuesta del bot (sólo efecto visual).
    pub reply_delay: Duration,
    pub max_message_bytes: usize,
    pub max_sessions: usize,
    /// Las sesiones sin actividad durante este tiempo se descartan.
    pub session_idle_timeout: Duration,
    pub max_turns_per_session: usize,
    pub allowed_origins: AllowedOrigins,
    pub static_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8000".to_string(),
            reply_delay: Duration::from_millis(1500),
            max_message_bytes: 4096,
            max_sessions: 10_000,
            session_idle_timeout: Duration::from_secs(30 * 60),
            max_turns_per_session: 100,
            allowed_origins: AllowedOrigins::List(
                DEFAULT_ORIGINS.split(',').map(str::to_string).collect(),
            ),
            static_dir: None,
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo de cualquier fuente clave/valor.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_addr = lookup("SERVER_ADDR").unwrap_or(defaults.server_addr);

        let reply_delay = match lookup("CHAT_REPLY_DELAY_MS") {
            Some(v) => Duration::from_millis(
                v.trim()
                    .parse()
                    .with_context(|| format!("CHAT_REPLY_DELAY_MS inválido: {v}"))?,
            ),
            None => defaults.reply_delay,
        };

        let max_message_bytes = parse_positive(&lookup, "MAX_MESSAGE_BYTES")?
            .unwrap_or(defaults.max_message_bytes);
        let max_sessions =
            parse_positive(&lookup, "MAX_SESSIONS")?.unwrap_or(defaults.max_sessions);
        let session_idle_timeout = parse_positive(&lookup, "SESSION_IDLE_TIMEOUT_SECS")?
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(defaults.session_idle_timeout);
        let max_turns_per_session = parse_positive(&lookup, "MAX_TURNS_PER_SESSION")?
            .unwrap_or(defaults.max_turns_per_session);

        let allowed_origins = match lookup("ALLOWED_ORIGINS") {
            Some(v) => AllowedOrigins::parse(&v)?,
            None => defaults.allowed_origins,
        };

        let static_dir = lookup("STATIC_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            server_addr,
            reply_delay,
            max_message_bytes,
            max_sessions,
            session_idle_timeout,
            max_turns_per_session,
            allowed_origins,
            static_dir,
        })
    }
}

fn parse_positive<F>(lookup: &F, key: &str) -> Result<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} inválido: {raw}"))?;
    if value == 0 {
        return Err(anyhow!("{key} debe ser mayor que cero"));
    }
    Ok(Some(value))
}
