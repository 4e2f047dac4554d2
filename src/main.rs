use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vitrine_core::catalog::CatalogStore;
use vitrine_core::cli::{self, Cli, Commands};
use vitrine_core::config::Config;
use vitrine_core::settings::SettingsStore;
use vitrine_core::store::{FileOrderStore, OrderStore};
use vitrine_core::{create_app, http_client, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter so RUST_LOG from the file is honored.
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Config => cli::handle_config_show(&config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let settings = Arc::new(SettingsStore::open(config.settings_path()).await?);
    let catalog = Arc::new(CatalogStore::open(config.catalog_path()).await?);
    let store: Arc<dyn OrderStore> = Arc::new(FileOrderStore::open(config.orders_path()).await?);
    tracing::info!(data_dir = %config.data_dir.display(), "stores opened");

    let state = AppState::new(store, catalog, settings, http_client());
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
