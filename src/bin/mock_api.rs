use tracing::{error, info};

use intent_router::{
    config::Config,
    logging::init_logging,
    mock_api::{self, MockApiState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.mock_api.port,
        "Mock tool API starting..."
    );

    let addr = format!("0.0.0.0:{}", config.mock_api.port);
    let server = mock_api::serve(&addr, MockApiState::default());

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!(error = %e, "Mock API server error");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
        }
    }

    Ok(())
}
