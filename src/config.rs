use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Process-level configuration read from the environment at startup.
/// Operator-editable settings live in [`crate::settings`] instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Directory holding the JSON files for settings, catalog and orders.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            data_dir: env::var("DATA_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("packages.json")
    }

    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join("orders.json")
    }
}
