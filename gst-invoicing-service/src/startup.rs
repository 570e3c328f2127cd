//! Router assembly and server lifecycle.

use crate::config::InvoicingConfig;
use crate::handlers;
use crate::services::{
    DashboardComposer, DirectoryStore, InvoiceRepository, InvoiceStore, LifecycleManager, MongoDb,
    OverdueSweeper, ReportService, TokenVerifier,
};
use axum::{
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{http_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub repository: InvoiceRepository,
    pub lifecycle: LifecycleManager,
    pub reports: ReportService,
    pub dashboard: DashboardComposer,
    pub directory: Arc<dyn DirectoryStore>,
    pub store: Arc<dyn InvoiceStore>,
    pub tokens: TokenVerifier,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InvoiceStore>,
        directory: Arc<dyn DirectoryStore>,
        tokens: TokenVerifier,
    ) -> Self {
        let repository = InvoiceRepository::new(store.clone(), directory.clone());
        let reports = ReportService::new(store.clone(), directory.clone());
        let dashboard = DashboardComposer::new(reports.clone(), repository.clone());

        Self {
            lifecycle: LifecycleManager::new(store.clone()),
            repository,
            reports,
            dashboard,
            directory,
            store,
            tokens,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let invoices = Router::new()
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route("/invoices/summary", get(handlers::invoice_summary))
        .route("/invoices/dashboard-stats", get(handlers::dashboard_stats))
        .route("/invoices/check-overdue", post(handlers::check_overdue))
        .route(
            "/invoices/:id",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route("/invoices/:id/mark-paid", post(handlers::mark_paid));

    let reports = Router::new()
        .route("/gst-reports/summary", get(handlers::gst_summary))
        .route("/gst-reports/rate-wise", get(handlers::gst_rate_wise))
        .route("/gst-reports/monthly", get(handlers::gst_monthly))
        .route("/gst-reports/details", get(handlers::gst_details));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(invoices)
        .merge(reports)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| http_request_span(request)),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    sweeper: OverdueSweeper,
}

impl Application {
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let db = Arc::new(db);
        let state = AppState::new(db.clone(), db, TokenVerifier::new(&config.jwt_secret));
        let sweeper = OverdueSweeper::new(config.sweep, state.lifecycle.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
            sweeper,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM. The overdue sweeper runs alongside and is
    /// cancelled once the server has drained.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let sweeper_token = self.sweeper.shutdown_token();
        let sweeper = tokio::spawn(self.sweeper.start());

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper_token.cancel();
        if let Err(e) = sweeper.await {
            tracing::error!("Overdue sweeper task failed: {}", e);
        }

        result
    }
}

async fn shutdown_signal() {
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
