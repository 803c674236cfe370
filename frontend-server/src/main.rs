mod server;

use std::net::SocketAddr;
use std::process::ExitCode;

use ecoes_bff_axum::{AppState, Settings, app_router};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    server::init_tracing("frontend_server");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    settings.log_summary();

    let addr: SocketAddr = match settings.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address {}: {}", settings.bind_address(), e);
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::new(settings) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to build backend client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match server::serve(addr, app_router(state)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
