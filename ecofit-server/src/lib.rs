//! HTTP API of the EcoFit waste assistant.
//!
//! # Routes
//!
//! - `GET /` and `GET /api/v1/health` for liveness, `GET /api/v1/health/db` for the user store
//! - `POST /api/v1/dispose` classifies an item and checks it against its bin's threshold
//! - `POST /api/v1/fit` does the same for an item whose type is already known
//! - `GET /api/v1/check-distance` reads the ESP32 sensor, `POST` checks an item against the
//!   volume it measures
//! - `POST /api/v1/user/register`, `POST /api/v1/user/login`, `GET /api/v1/user/{user_id}` and
//!   `PUT /api/v1/user/{user_id}/profile` for accounts
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=info ESP32_IP=192.168.43.168 cargo run -p ecofit-server
//! ```
//!
//! Configuration is read from the environment, see [`config::Config`].

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
};
use reqwest::Client;
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ecofit_classifier_keyword as keyword;
use ecofit_classifier_model as model;
use ecofit_core::{plugin::ClassifierRegistry, service::EcoFitService};
use ecofit_sensor_esp32 as esp32;

pub mod accounts;
pub mod config;
pub mod error;
pub mod payloads;
pub mod routes;
pub mod state;
pub mod store;

use accounts::Accounts;
use config::Config;
use state::AppState;
use store::SqliteUserStore;

/// Build the CORS layer for the configured origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {err}");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

/// Wire adapters into the service and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Fails on invalid configuration, an unknown classifier backend, a user
/// store that cannot be opened or an address that cannot be bound.
pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::load()?;

    let client = Client::builder().user_agent("ecofit/0.1").build()?;

    let mut backends = vec![keyword::backend()];
    if let Some(url) = &config.model_url {
        backends.push(model::backend(client.clone(), url));
    }
    let registry = ClassifierRegistry::new(backends);
    let classifier = registry.backend(&config.classifier)?;

    let sensor = esp32::sensor(client, config.sensor_address.clone(), config.sensor_timeout);
    let service = EcoFitService::new(classifier, sensor).with_geometry(config.bin_geometry);
    info!(
        classifier = service.classifier_id(),
        available = ?registry.ids(),
        sensor = service.sensor_address(),
        "Service ready"
    );

    let store = Arc::new(SqliteUserStore::new(config.database_path.clone()));
    store
        .connect()
        .await
        .with_context(|| format!("opening user database {}", config.database_path))?;
    let accounts = Accounts::new(Arc::<SqliteUserStore>::clone(&store), config.bcrypt_cost);

    let app: Router = routes::router(AppState::new(service, accounts))
        .layer(cors_layer(&config.allowed_origins));

    let address = config.bind_address();
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
