use crate::api::{self, Mode};
use crate::commands::Out;
use crate::dashboard::SystemClock;
use crate::error::{ErrorType, IntoResult};
use crate::server::{self, AppState};
use crate::{Config, Result};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::debug;

/// Runs the HTTP API until Ctrl-C or SIGTERM. `port` overrides the configured port.
pub async fn serve(config: Config, mode: Mode, port: Option<u16>) -> Result<Out<()>> {
    let admin = config.load_admin().await?;
    let sheet = api::sheet(&config, mode)
        .await
        .pub_result(ErrorType::Config)?;
    let state = AppState::new(&config, sheet, admin, Arc::new(SystemClock));
    let app = server::router(state, config.allowed_origins()).pub_result(ErrorType::Config)?;

    let address = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or_else(|| config.port())));
    debug!("Binding {address}");
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Unable to listen on {address}"))
        .pub_result(ErrorType::Config)?;

    server::run(listener, app, server::shutdown_signal())
        .await
        .pub_result(ErrorType::Internal)?;
    Ok("The server has stopped".into())
}
