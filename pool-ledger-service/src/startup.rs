//! Application startup and lifecycle management.

use crate::config::LedgerConfig;
use crate::handlers::{
    analytics, customers, health_check, invoices, metrics_handler, payments, readiness_check,
    visits,
};
use crate::services::{init_metrics, metrics::metrics_middleware, Database};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::{http_trace_layer, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: LedgerConfig,
    pub db: Arc<Database>,
}

/// Build the HTTP router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/invoices/generate", post(invoices::generate_invoices))
        .route("/invoices/mark-overdue", post(invoices::mark_overdue))
        .route("/invoices/:invoice_id", get(invoices::get_invoice))
        .route("/invoices/:invoice_id/payments", post(payments::pay_invoice))
        .route("/payments", post(payments::allocate_payment))
        .route(
            "/customers/:customer_id/invoices",
            get(invoices::list_customer_invoices),
        )
        .route("/customers/:customer_id", put(customers::sync_customer))
        .route("/customers/:customer_id/owed", get(customers::customer_owed))
        .route(
            "/customers/:customer_id/service-plan",
            put(customers::assign_service_plan),
        )
        .route("/service-visits", post(visits::record_service_visit))
        .route("/analytics", get(analytics::get_analytics))
        .layer(http_trace_layer())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: LedgerConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let state = AppState {
            config: config.clone(),
            db: Arc::new(db),
        };

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Pool ledger service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> Arc<Database> {
        self.state.db.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        let app = router(self.state);
        axum::serve(self.http_listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
