use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_tms::config::{DatabaseConfig, EnvironmentConfig};
use fleet_tms::database::connect_and_migrate;
use fleet_tms::middleware::cors::cors_layer;
use fleet_tms::routes::create_app_router;
use fleet_tms::services::broadcast_hub::PositionSource;
use fleet_tms::services::{PositionPoller, TrackingHub};
use fleet_tms::state::{AppState, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging; en desarrollo se incluye archivo y línea
    let development = config.is_development();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_file(development)
        .with_line_number(development)
        .init();

    info!("🚚 Fleet TMS - Verificación y seguimiento GPS");
    info!("================================================");

    // Inicializar base de datos
    let pool = match connect_and_migrate(&DatabaseConfig::from_env()?).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {:#}", e);
            return Err(e);
        }
    };

    // Hub en vivo y poller de posiciones
    let (hub, hub_task) = TrackingHub::start(config.hub_config());
    let app_state = AppState::new(config.clone(), Stores::postgres(pool), hub.clone());
    let source: Arc<dyn PositionSource> = app_state.tracking.clone();
    let poller_task = PositionPoller::start(source, hub, config.hub_poll_interval);
    let dispatcher = app_state.dispatcher.clone();

    let app = create_app_router(app_state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("🛡️ Admin (/api/v1/admin):");
    info!("   PUT  /vehicles/:id/verify | /vehicles/:id/correction");
    info!("   POST /vehicles/:id/cross-check | /vehicles/:id/schedule-inspection");
    info!("   GET  /vehicles/pending | /vehicles/status/:status | /vehicles/:id/history");
    info!("   GET  /verification-dashboard");
    info!("📍 GPS (/api/v1):");
    info!("   POST /gps/data | /gps/data/batch");
    info!("   GET  /gps/positions | /gps/history/:device_id | /gps/live (WebSocket)");
    info!("   /gps-registration, /gps-devices");
    info!("📨 Notificaciones: GET /api/v1/notifications, PUT /api/v1/notifications/:id/read");

    // Detener el hub cierra los sockets en vivo
    let stop_background = async move {
        shutdown_signal().await;
        poller_task.shutdown().await;
        hub_task.shutdown().await;
    };

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(stop_background)
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    dispatcher.shutdown().await;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("⚠️ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("⚠️ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
