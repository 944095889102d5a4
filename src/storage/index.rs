use crate::{
    error::{Prompt2ImageError, Result},
    models::StoredImageRecord,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Image id -> record map, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    path: Option<PathBuf>,
    records: BTreeMap<String, StoredImageRecord>,
}

impl MetadataIndex {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file gives an empty index bound to that path.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                Prompt2ImageError::Storage(format!(
                    "corrupt metadata index {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            records,
        })
    }

    /// Write the index through a temp file and rename. No-op when in memory.
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(&self.records)
            .map_err(|e| Prompt2ImageError::Storage(e.to_string()))?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, image_id: &str) -> Option<&StoredImageRecord> {
        self.records.get(image_id)
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.records.contains_key(image_id)
    }

    pub fn find_by_filename(&self, filename: &str) -> Option<&StoredImageRecord> {
        self.records.values().find(|r| r.filename == filename)
    }

    pub fn insert(&mut self, record: StoredImageRecord) -> Option<StoredImageRecord> {
        self.records.insert(record.image_id.clone(), record)
    }

    pub fn remove(&mut self, image_id: &str) -> Option<StoredImageRecord> {
        self.records.remove(image_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &StoredImageRecord> {
        self.records.values()
    }

    /// Keep only records for which `keep` is true; returns how many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&StoredImageRecord) -> bool,
    {
        let before = self.records.len();
        self.records.retain(|_, r| keep(r));
        before - self.records.len()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, filename: &str) -> StoredImageRecord {
        StoredImageRecord {
            image_id: id.into(),
            filename: filename.into(),
            prompt: "p".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".metadata.json");

        let mut index = MetadataIndex::load(&path).await.unwrap();
        assert!(index.is_empty());
        index.insert(record("a", "a.png"));
        index.insert(record("b", "b.png"));
        index.persist().await.unwrap();

        let reloaded = MetadataIndex::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.find_by_filename("b.png").unwrap().image_id, "b");
        assert!(!dir.path().join(".metadata.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".metadata.json");
        std::fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            MetadataIndex::load(&path).await,
            Err(Prompt2ImageError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_persist_is_noop() {
        let mut index = MetadataIndex::in_memory();
        index.insert(record("a", "a.png"));
        index.persist().await.unwrap();
        assert!(index.path().is_none());
        assert!(index.contains("a"));
    }

    #[test]
    fn test_retain_counts_removed() {
        let mut index = MetadataIndex::in_memory();
        index.insert(record("a", "a.png"));
        index.insert(record("b", "b.png"));
        assert_eq!(index.retain(|r| r.image_id == "a"), 1);
        assert!(index.get("b").is_none());
    }
}
