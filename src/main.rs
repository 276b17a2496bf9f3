use std::net::SocketAddr;

use storefront_backend::{
    config::{get_config, init_config, LogFormat},
    database::{seed::seed_demo_data, Database},
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;
    init_tracing(config.log_format);

    let database = Database::connect(config).await?;
    info!(backend = database.backend_name(), environment = config.app_env.as_str(), "Storage ready");

    if config.seed_demo_data {
        seed_demo_data(&database).await?;
    }

    let app = routes::router(AppState::new(database, config.clone()));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
