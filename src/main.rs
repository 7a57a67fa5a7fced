use boardsync::config::ServerConfig;
use boardsync::routes;
use boardsync::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let config = ServerConfig::from_env()?;
    let state = AppState::new(config.client_channel_capacity);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;

    tracing::info!(addr = %config.listen_addr(), "boardsync listening");
    axum::serve(listener, app).await?;
    Ok(())
}
