use gst_invoicing_service::config::InvoicingConfig;
use gst_invoicing_service::services::init_metrics;
use gst_invoicing_service::Application;
use service_core::error::expose_error_details;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Metrics recorder must exist before the first request is counted
    init_metrics();

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing("gst-invoicing-service", "info", otlp_endpoint.as_deref());

    let config = InvoicingConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    expose_error_details(!config.is_production);

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
