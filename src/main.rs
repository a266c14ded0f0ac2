use deploy_pipeline::config::PipelineConfig;
use deploy_pipeline::logging::{FileLogger, setup_logging};
use deploy_pipeline::publisher::SnsPublisher;
use deploy_pipeline::{AppState, build_router};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match PipelineConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let file_logger = config.log_dir.clone().map(FileLogger::new);
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup failed: {}", e);
            std::process::exit(1);
        }
    };

    info!("Handling deployments for {}", config.handled_repo());
    info!("Using config {:?}", config);

    let bind_address = config.bind_address();
    let publisher = Arc::new(SnsPublisher::from_env().await);
    let state = Arc::new(AppState::new(config, publisher));
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    match listener.local_addr() {
        Ok(addr) => info!("Starting service on port {}", addr.port()),
        Err(_) => info!("Listening on {}", bind_address),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
