// Events site server

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use events_site::{
    app_state::AppState, config::Config, infrastructure::monitoring::init_tracing,
    router::create_app_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;
    let app = create_app_router(app_state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Events site listening on http://{}", addr);
    info!("  GET  /events?limit=N          - Upcoming events plus recent past events");
    info!("  POST /events/create_event     - Create event (session required)");
    info!("  POST /events/update_event     - Update event by slug (session required)");
    info!("  POST /events/remove_event     - Delete event by slug (session required)");
    info!("  POST /events/upload_image     - Upload image (session required)");
    info!("  GET  /images/{{name}}           - Stored image with ETag caching");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
