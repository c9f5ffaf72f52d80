use crate::config::AdminConfig;
use crate::handlers::{alerts, analytics, assignments, bikes, health, maintenance, payments};
use crate::handlers::{riders, tickets};
use crate::services::{MongoDb, Synchronizer};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use fleet_core::error::AppError;
use fleet_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AdminConfig,
    pub db: MongoDb,
    pub sync: Synchronizer,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    pub async fn build(config: AdminConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(config.mongodb.uri.expose_secret(), &config.mongodb.database)
            .await?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            sync: Synchronizer::new(db, config.sync.max_retries),
        };

        let router = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    pub fn db(&self) -> &MongoDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_endpoint))
        .route(
            "/riders",
            get(riders::list_riders).post(riders::create_rider),
        )
        .route(
            "/riders/:id",
            get(riders::get_rider)
                .put(riders::update_rider)
                .delete(riders::delete_rider),
        )
        .route("/bikes", get(bikes::list_bikes).post(bikes::create_bike))
        .route(
            "/bikes/:id",
            get(bikes::get_bike)
                .put(bikes::update_bike)
                .delete(bikes::delete_bike),
        )
        .route(
            "/assignments",
            get(assignments::list_assignments).post(assignments::create_assignment),
        )
        .route(
            "/assignments/:id",
            get(assignments::get_assignment)
                .put(assignments::update_assignment)
                .delete(assignments::delete_assignment),
        )
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/payments/overdue-sweep", post(payments::sweep_overdue))
        .route(
            "/payments/:id",
            get(payments::get_payment)
                .put(payments::update_payment)
                .delete(payments::delete_payment),
        )
        .route(
            "/maintenance",
            get(maintenance::list_maintenance).post(maintenance::create_maintenance),
        )
        .route(
            "/maintenance/:id",
            get(maintenance::get_maintenance)
                .put(maintenance::update_maintenance)
                .delete(maintenance::delete_maintenance),
        )
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/:id/replies", post(tickets::add_reply))
        .route("/analytics/overview", get(analytics::overview))
        .route("/analytics/revenue", get(analytics::revenue))
        .route("/alerts", get(alerts::list_alerts))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
