// Módulos de la aplicación
mod api;
mod app_state;
mod chat;
mod config;
mod error;
mod models;
mod responder;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    app_state::AppState,
    config::{AllowedOrigins, AppConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = AppConfig::from_env().context("Error al cargar la configuración")?;
    info!(
        "Pausa de respuesta: {} ms, tamaño máximo de mensaje: {} bytes",
        cfg.reply_delay.as_millis(),
        cfg.max_message_bytes
    );

    // 3. Estado compartido y router
    let app_state = AppState::new(cfg.clone());
    let sweep_every = cfg.session_idle_timeout.min(Duration::from_secs(60));
    let _sweeper = app_state.sessions.spawn_sweeper(sweep_every);
    let app = build_app(app_state, &cfg)?;

    // 4. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&cfg.server_addr)
        .await
        .with_context(|| format!("No se pudo abrir {}", cfg.server_addr))?;
    info!("🚀 Servidor escuchando en http://{}", cfg.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Error en el servidor HTTP")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}

fn build_app(app_state: AppState, cfg: &AppConfig) -> Result<Router> {
    let mut app = api::create_router(app_state);

    if let Some(dir) = &cfg.static_dir {
        if dir.is_dir() {
            info!("Sirviendo frontend estático desde {}", dir.display());
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            warn!("STATIC_DIR {} no es un directorio; se ignora.", dir.display());
        }
    }

    Ok(app
        .layer(cors_layer(&cfg.allowed_origins)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(origins: &AllowedOrigins) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        AllowedOrigins::Any => Ok(layer.allow_origin(Any)),
        AllowedOrigins::List(list) => {
            let values = list
                .iter()
                .map(|o| {
                    o.parse::<HeaderValue>()
                        .with_context(|| format!("Origen CORS inválido: {o}"))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(layer.allow_origin(AllowOrigin::list(values)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("No se pudo escuchar Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Señal de apagado recibida, iniciando cierre del servidor.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_configured_origins() {
        let origins = AllowedOrigins::List(vec!["http://localhost:5173".to_string()]);
        assert!(cors_layer(&origins).is_ok());
        assert!(cors_layer(&AllowedOrigins::Any).is_ok());
    }

    #[test]
    fn cors_rejects_malformed_origin() {
        let origins = AllowedOrigins::List(vec!["bad\norigin".to_string()]);
        assert!(cors_layer(&origins).is_err());
    }

    #[test]
    fn missing_static_dir_is_ignored() {
        let cfg = AppConfig {
            static_dir: Some("/definitely/not/here".into()),
            ..AppConfig::default()
        };
        assert!(build_app(AppState::new(cfg.clone()), &cfg).is_ok());
    }
}
