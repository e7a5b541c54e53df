use std::net::SocketAddr;
use std::sync::Arc;

use grades_portal::{
    config::{get_config, init_config},
    middleware::cors::portal_cors,
    routes,
    services::google_sheets::GoogleSheetsClient,
    AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("grades_portal=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    init_config()?;
    let config = get_config();

    if let Err(err) = config.google.credentials() {
        warn!(error = %err, "Google Sheets is not fully configured; grade endpoints will fail");
    }

    let sheets = Arc::new(GoogleSheetsClient::new(config.google.clone())?);
    let app_state = AppState::new(config.clone(), sheets);

    let app = routes::app(app_state)
        .layer(portal_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
