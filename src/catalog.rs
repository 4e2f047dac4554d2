//! Package catalog backed by a JSON file.
//!
//! Like the settings, the catalog is read-mostly: storefront requests look
//! packages up on every order while the admin panel replaces the whole
//! catalog rarely. An [`ArcSwap`] keeps lookups lock-free.

use arc_swap::ArcSwap;
use bigdecimal::BigDecimal;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{Category, Package};
use crate::store::{write_json_atomic, StoreError};

pub struct CatalogStore {
    categories: ArcSwap<Vec<Category>>,
    path: Option<PathBuf>,
}

impl CatalogStore {
    /// Catalog without persistence, for tests and ephemeral runs.
    pub fn in_memory(categories: Vec<Category>) -> Self {
        Self {
            categories: ArcSwap::from_pointee(categories),
            path: None,
        }
    }

    /// Loads the catalog from `path`, seeding the default storefront when
    /// the file does not exist yet.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let categories = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let seeded = default_catalog();
                write_json_atomic(&path, &seeded).await?;
                seeded
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            categories: ArcSwap::from_pointee(categories),
            path: Some(path),
        })
    }

    pub fn categories(&self) -> Arc<Vec<Category>> {
        self.categories.load_full()
    }

    pub fn find_package(&self, id: u64) -> Option<Package> {
        self.categories
            .load()
            .iter()
            .flat_map(|category| category.packages.iter())
            .find(|package| package.id == id)
            .cloned()
    }

    /// Replaces the whole catalog and persists it.
    pub async fn replace(&self, categories: Vec<Category>) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            write_json_atomic(path, &categories).await?;
        }
        self.categories.store(Arc::new(categories));
        Ok(())
    }
}

fn price(cents: i64) -> BigDecimal {
    BigDecimal::new(cents.into(), 2)
}

/// Starter catalog used on first boot so the storefront is sellable before
/// the operator has touched the admin panel.
pub fn default_catalog() -> Vec<Category> {
    vec![
        Category {
            id: "instagram_followers".to_string(),
            name: "Instagram Followers".to_string(),
            description: "Gradual delivery, no password required.".to_string(),
            packages: vec![
                Package {
                    id: 101,
                    name: "1000 Followers".to_string(),
                    price: price(19_90),
                    min: 1000,
                    max: 1000,
                    service_id: None,
                },
                Package {
                    id: 102,
                    name: "5000 Followers".to_string(),
                    price: price(79_90),
                    min: 5000,
                    max: 5000,
                    service_id: None,
                },
            ],
        },
        Category {
            id: "instagram_likes".to_string(),
            name: "Instagram Likes".to_string(),
            description: "Split across your latest posts.".to_string(),
            packages: vec![
                Package {
                    id: 201,
                    name: "500 Likes".to_string(),
                    price: price(9_90),
                    min: 500,
                    max: 500,
                    service_id: None,
                },
                Package {
                    id: 202,
                    name: "2000 Likes".to_string(),
                    price: price(29_90),
                    min: 2000,
                    max: 2000,
                    service_id: None,
                },
            ],
        },
    ]
}
