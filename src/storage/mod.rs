use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Category, ProductRecord};

mod changelog;
mod json;

pub use changelog::{ChangeLog, ChangeLogEntry};
pub use json::JsonCatalogStore;

/// Durable ground truth of the catalog: one ordered record collection per
/// category. Single-writer; the run guard in the orchestrator serializes
/// all mutation.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the category's records in discovery order; empty when
    /// nothing has been stored yet.
    async fn load(&self, category: Category) -> Result<Vec<ProductRecord>>;

    /// Appends `new_records` after the existing records and persists the
    /// whole collection atomically.
    async fn append_incremental(&self, category: Category, new_records: &[ProductRecord]) -> Result<()>;

    /// Replaces the category's full contents (full-reload sync mode).
    async fn overwrite(&self, category: Category, records: &[ProductRecord]) -> Result<()>;

    /// Whether a product URL is already stored for the category.
    async fn contains_url(&self, category: Category, url: &str) -> Result<bool>;

    /// Concatenation across the given categories, preserving their order.
    /// Read path for the storefront's catalog API.
    async fn load_all(&self, categories: &[Category]) -> Result<Vec<ProductRecord>>;
}
