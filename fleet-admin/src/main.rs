use fleet_admin::config::AdminConfig;
use fleet_admin::services::init_metrics;
use fleet_admin::startup::Application;
use fleet_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Metrics recorder must exist before anything records
    init_metrics();

    let config = AdminConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing("fleet-admin", &config.observability);

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start fleet-admin: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_until_stopped().await?;

    tracing::info!("fleet-admin stopped");
    Ok(())
}
