use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::settings::SettingsStore;

#[derive(Parser)]
#[command(name = "vitrine-core")]
#[command(about = "Vitrine Core - SMM Storefront Order & Payment Backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Validate and print the stored configuration, secrets masked
    Config,
}

pub async fn handle_config_show(config: &Config) -> anyhow::Result<()> {
    let store = SettingsStore::open(config.settings_path()).await?;
    let settings = store.current();
    settings.validate()?;

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Data Dir: {}", config.data_dir.display());
    println!("  Mode: {:?}", settings.mode);
    println!("  Active Gateway: {}", settings.active_gateway);
    println!("  PushinPay URL: {}", settings.pushinpay.api_url);
    println!(
        "  PushinPay Token: {}",
        mask_secret(&settings.pushinpay.api_token)
    );
    println!("  Mercado Pago URL: {}", settings.mercadopago.api_url);
    println!(
        "  Mercado Pago Token: {}",
        mask_secret(&settings.mercadopago.access_token)
    );
    println!("  Supplier URL: {}", settings.supplier.api_url);
    println!(
        "  Supplier Key: {}",
        mask_secret(&settings.supplier.api_key)
    );

    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "(unset)".to_string();
    }
    if trimmed.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = trimmed.chars().take(4).collect();
    format!("{prefix}****")
}
