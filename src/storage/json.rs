use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::models::{Category, ProductRecord};
use crate::storage::CatalogStore;

/// One JSON document per category under the data directory, named
/// `products_<tag>.json`, the layout the storefront application reads.
pub struct JsonCatalogStore {
    data_dir: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn category_path(&self, category: Category) -> PathBuf {
        self.data_dir.join(format!("products_{}.json", category.key()))
    }

    async fn read_records(path: &Path) -> Result<Vec<ProductRecord>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        serde_json::from_slice(&bytes).with_context(|| format!("decoding {}", path.display()))
    }

    /// Writes the collection to a sibling temp file, flushes, then renames
    /// over the target. A crash mid-write leaves the committed file intact;
    /// the stale temp file is simply overwritten on the next write (the
    /// store is single-writer).
    async fn write_records(&self, path: &Path, records: &[ProductRecord]) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("creating data directory {}", self.data_dir.display()))?;

        let bytes = serde_json::to_vec_pretty(records).context("encoding catalog records")?;

        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        let mut file = fs::File::create(&temp_path)
            .await
            .with_context(|| format!("creating temp file {}", temp_path.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp file {}", temp_path.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("syncing temp file {}", temp_path.display()))?;
        drop(file);

        fs::rename(&temp_path, path)
            .await
            .with_context(|| format!("committing {}", path.display()))
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn load(&self, category: Category) -> Result<Vec<ProductRecord>> {
        Self::read_records(&self.category_path(category)).await
    }

    async fn append_incremental(&self, category: Category, new_records: &[ProductRecord]) -> Result<()> {
        let path = self.category_path(category);
        let mut records = Self::read_records(&path).await?;
        records.extend_from_slice(new_records);
        self.write_records(&path, &records).await?;
        info!(
            category = %category,
            appended = new_records.len(),
            total = records.len(),
            "persisted catalog increment"
        );
        Ok(())
    }

    async fn overwrite(&self, category: Category, records: &[ProductRecord]) -> Result<()> {
        let path = self.category_path(category);
        self.write_records(&path, records).await?;
        info!(category = %category, total = records.len(), "replaced category catalog");
        Ok(())
    }

    async fn contains_url(&self, category: Category, url: &str) -> Result<bool> {
        let records = self.load(category).await?;
        Ok(records.iter().any(|record| record.url == url))
    }

    async fn load_all(&self, categories: &[Category]) -> Result<Vec<ProductRecord>> {
        let mut all = Vec::new();
        for category in categories {
            all.extend(self.load(*category).await?);
        }
        Ok(all)
    }
}
