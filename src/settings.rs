//! Operator-editable runtime settings.
//!
//! Settings are persisted as a JSON file and held in memory behind an
//! [`ArcSwap`] so request handlers read a consistent snapshot without
//! locking. Every operation takes one snapshot up front; rotating
//! credentials mid-flight never mixes old and new values inside a single
//! operation.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::store::write_json_atomic;

/// Gateway names accepted for `active_gateway`, stored lowercase.
pub const KNOWN_GATEWAYS: &[&str] = &["pushinpay", "mercadopago"];

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// No outbound network calls; synthetic charges and dispatches.
    Simulated,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushinPaySettings {
    /// Full charge-creation endpoint, not just the host.
    pub api_url: String,
    pub api_token: String,
    pub webhook_url: Option<String>,
}

impl Default for PushinPaySettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.pushinpay.com.br/api/pix/cashIn".to_string(),
            api_token: String::new(),
            webhook_url: None,
        }
    }
}

impl PushinPaySettings {
    pub fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty() && !self.api_token.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MercadoPagoSettings {
    pub access_token: String,
    pub api_url: String,
    pub notification_url: Option<String>,
}

impl Default for MercadoPagoSettings {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_url: "https://api.mercadopago.com".to_string(),
            notification_url: None,
        }
    }
}

impl MercadoPagoSettings {
    pub fn is_configured(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.api_url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierSettings {
    pub api_url: String,
    pub api_key: String,
    /// Service used when a package carries no service of its own.
    pub default_service: Option<String>,
    pub default_quantity: u32,
    /// Response field holding the order status, for panels that use a
    /// non-standard key.
    pub status_field: Option<String>,
}

impl Default for SupplierSettings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            default_service: None,
            default_quantity: 100,
            status_field: None,
        }
    }
}

impl SupplierSettings {
    pub fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: OperatingMode,
    /// Lowercase name of the gateway used for new charges.
    pub active_gateway: String,
    pub pushinpay: PushinPaySettings,
    pub mercadopago: MercadoPagoSettings,
    pub supplier: SupplierSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Simulated,
            active_gateway: "pushinpay".to_string(),
            pushinpay: PushinPaySettings::default(),
            mercadopago: MercadoPagoSettings::default(),
            supplier: SupplierSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !KNOWN_GATEWAYS.contains(&self.active_gateway.as_str()) {
            return Err(SettingsError::Invalid(format!(
                "unknown gateway '{}', expected one of: {}",
                self.active_gateway,
                KNOWN_GATEWAYS.join(", ")
            )));
        }

        let urls = [
            ("pushinpay.api_url", Some(self.pushinpay.api_url.as_str())),
            ("pushinpay.webhook_url", self.pushinpay.webhook_url.as_deref()),
            ("mercadopago.api_url", Some(self.mercadopago.api_url.as_str())),
            (
                "mercadopago.notification_url",
                self.mercadopago.notification_url.as_deref(),
            ),
            ("supplier.api_url", Some(self.supplier.api_url.as_str())),
        ];
        for (field, value) in urls {
            if let Some(value) = value {
                if !value.trim().is_empty() {
                    Url::parse(value).map_err(|e| {
                        SettingsError::Invalid(format!("{field} is not a valid URL: {e}"))
                    })?;
                }
            }
        }

        if self.supplier.default_quantity == 0 {
            return Err(SettingsError::Invalid(
                "supplier.default_quantity must be at least 1".to_string(),
            ));
        }

        if let Some(field) = &self.supplier.status_field {
            if field.trim().is_empty() {
                return Err(SettingsError::Invalid(
                    "supplier.status_field must not be blank".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Holds the current settings snapshot and writes changes through to disk.
pub struct SettingsStore {
    current: ArcSwap<Settings>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Store without persistence, for tests and ephemeral runs.
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            current: ArcSwap::from_pointee(settings),
            path: None,
        }
    }

    /// Loads settings from `path`, creating the file with defaults when it
    /// does not exist yet.
    pub async fn open(path: PathBuf) -> Result<Self, SettingsError> {
        let settings = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = Settings::default();
                write_json_atomic(&path, &defaults).await?;
                defaults
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            current: ArcSwap::from_pointee(settings),
            path: Some(path),
        })
    }

    pub fn current(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Validates, persists and swaps in new settings. Operations that took
    /// a snapshot before the swap keep running against the old values.
    pub async fn save(&self, settings: Settings) -> Result<(), SettingsError> {
        settings.validate()?;

        if let Some(path) = &self.path {
            write_json_atomic(path, &settings).await?;
        }
        self.current.store(Arc::new(settings));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_gateway_is_rejected() {
        let settings = Settings {
            active_gateway: "paypal".to_string(),
            ..Settings::default()
        };

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
        assert!(err.to_string().contains("paypal"));
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        let mut settings = Settings::default();
        settings.supplier.api_url = "not a url".to_string();

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_default_quantity_is_rejected() {
        let mut settings = Settings::default();
        settings.supplier.default_quantity = 0;

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_blank_status_field_is_rejected() {
        let mut settings = Settings::default();
        settings.supplier.status_field = Some("  ".to_string());

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_is_configured_requires_both_url_and_secret() {
        let mut pushinpay = PushinPaySettings::default();
        assert!(!pushinpay.is_configured());

        pushinpay.api_token = "token-123".to_string();
        assert!(pushinpay.is_configured());
    }

    #[test]
    fn test_partial_settings_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"active_gateway": "mercadopago"}"#).unwrap();

        assert_eq!(settings.active_gateway, "mercadopago");
        assert_eq!(settings.mode, OperatingMode::Simulated);
        assert_eq!(settings.supplier.default_quantity, 100);
    }

    #[tokio::test]
    async fn test_save_swaps_current_snapshot() {
        let store = SettingsStore::in_memory(Settings::default());
        let before = store.current();

        let mut updated = Settings::default();
        updated.mode = OperatingMode::Live;
        updated.pushinpay.api_token = "token-abc".to_string();
        store.save(updated).await.unwrap();

        assert_eq!(before.mode, OperatingMode::Simulated);
        assert_eq!(store.current().mode, OperatingMode::Live);
        assert_eq!(store.current().pushinpay.api_token, "token-abc");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_settings() {
        let store = SettingsStore::in_memory(Settings::default());

        let invalid = Settings {
            active_gateway: "stripe".to_string(),
            ..Settings::default()
        };

        assert!(store.save(invalid).await.is_err());
        assert_eq!(store.current().active_gateway, "pushinpay");
    }

    #[tokio::test]
    async fn test_open_creates_and_reloads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(path.clone()).await.unwrap();
        let mut updated = Settings::default();
        updated.supplier.api_url = "https://panel.example.com/api/v2".to_string();
        updated.supplier.api_key = "key-1".to_string();
        store.save(updated).await.unwrap();
        drop(store);

        let reopened = SettingsStore::open(path).await.unwrap();
        assert_eq!(
            reopened.current().supplier.api_url,
            "https://panel.example.com/api/v2"
        );
        assert_eq!(reopened.current().supplier.api_key, "key-1");
    }
}
