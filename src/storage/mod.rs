pub mod filename;
pub mod index;

use crate::{
    config::Config,
    error::{Prompt2ImageError, Result},
    models::{GalleryEntry, StorageInfo, StoredImageRecord},
};
use chrono::{DateTime, Duration, Utc};
use filename::{dotted_extension, file_stem, is_plain_file_name};
use index::MetadataIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const METADATA_FILE: &str = ".metadata.json";
pub const IMAGE_EXTENSION: &str = "png";

/// Owns the output directory and its metadata index. Every mutation holds the
/// index lock for its whole duration, so the directory and the index move
/// together.
pub struct ImageStore {
    output_dir: PathBuf,
    allowed_extensions: Vec<String>,
    max_bytes: u64,
    index: Mutex<MetadataIndex>,
}

impl ImageStore {
    /// Create the output directory if needed and load the index. Records whose
    /// file has disappeared are dropped.
    pub async fn open(config: &Config) -> Result<Self> {
        let output_dir = config.output_dir.clone();
        tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
            Prompt2ImageError::Storage(format!(
                "cannot create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let mut index = if config.enable_metadata {
            MetadataIndex::load(output_dir.join(METADATA_FILE)).await?
        } else {
            MetadataIndex::in_memory()
        };

        let dropped = index.retain(|r| output_dir.join(&r.filename).is_file());
        if dropped > 0 {
            log::warn!("Dropped {} index records without a file", dropped);
            index.persist().await?;
        }

        log::info!(
            "Image store at {} with {} records",
            output_dir.display(),
            index.len()
        );

        Ok(Self {
            output_dir,
            allowed_extensions: config
                .allowed_file_types
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            max_bytes: config.max_storage_bytes(),
            index: Mutex::new(index),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `bytes` under a name derived from `prompt` and `image_id` and
    /// record it. Returns the file name.
    pub async fn save(&self, bytes: &[u8], prompt: &str, image_id: &str) -> Result<String> {
        self.save_at(bytes, prompt, image_id, Utc::now()).await
    }

    pub(crate) async fn save_at(
        &self,
        bytes: &[u8],
        prompt: &str,
        image_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let mut index = self.index.lock().await;

        if index.contains(image_id) {
            return Err(Prompt2ImageError::Storage(format!(
                "image id {} is already stored",
                image_id
            )));
        }

        let used = self.directory_usage().await?.total_size_bytes;
        if used + bytes.len() as u64 > self.max_bytes {
            return Err(Prompt2ImageError::Storage(format!(
                "storage limit of {} MB reached",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let filename = self.unique_filename(&index, prompt, image_id);
        let path = self.output_dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;

        index.insert(StoredImageRecord {
            image_id: image_id.to_string(),
            filename: filename.clone(),
            prompt: prompt.to_string(),
            created_at,
        });
        if let Err(e) = index.persist().await {
            index.remove(image_id);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        log::info!("Saved {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    /// Remove the file and record for `image_id`. `Ok(false)` if unknown.
    pub async fn delete(&self, image_id: &str) -> Result<bool> {
        let mut index = self.index.lock().await;
        let removed = self.remove_record(&mut index, image_id).await?;
        if removed {
            index.persist().await?;
        }
        Ok(removed)
    }

    /// Delete by file name as used in URLs. Also removes stray image files
    /// that have no record.
    pub async fn delete_by_filename(&self, filename: &str) -> Result<bool> {
        if !is_plain_file_name(filename) {
            return Ok(false);
        }

        let mut index = self.index.lock().await;
        if let Some(id) = index.find_by_filename(filename).map(|r| r.image_id.clone()) {
            self.remove_record(&mut index, &id).await?;
            index.persist().await?;
            return Ok(true);
        }

        let path = self.output_dir.join(filename);
        if self.is_image_name(filename) && path.is_file() {
            tokio::fs::remove_file(&path).await?;
            log::info!("Deleted unindexed file {}", filename);
            return Ok(true);
        }
        Ok(false)
    }

    /// Delete every record created more than `older_than_days` ago.
    /// A day count too large to represent as a date removes nothing.
    pub async fn cleanup(&self, older_than_days: i64) -> Result<usize> {
        let Some(cutoff) = Duration::try_days(older_than_days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            log::warn!(
                "Cleanup age of {} days is out of range, nothing removed",
                older_than_days
            );
            return Ok(0);
        };
        let mut index = self.index.lock().await;

        let expired: Vec<String> = index
            .records()
            .filter(|r| r.created_at < cutoff)
            .map(|r| r.image_id.clone())
            .collect();

        let mut removed = 0;
        for id in &expired {
            if self.remove_record(&mut index, id).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            index.persist().await?;
            log::info!(
                "Cleanup removed {} images older than {} days",
                removed,
                older_than_days
            );
        }
        Ok(removed)
    }

    pub async fn storage_info(&self) -> Result<StorageInfo> {
        let _index = self.index.lock().await;
        self.directory_usage().await
    }

    /// Stored images, newest first.
    pub async fn list(&self) -> Result<Vec<GalleryEntry>> {
        let index = self.index.lock().await;
        let mut entries = Vec::with_capacity(index.len());

        for record in index.records() {
            let size = match tokio::fs::metadata(self.output_dir.join(&record.filename)).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            entries.push(GalleryEntry {
                image_id: record.image_id.clone(),
                filename: record.filename.clone(),
                url: format!("/output/{}", record.filename),
                prompt: record.prompt.clone(),
                created_at: record.created_at,
                size,
            });
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub async fn get(&self, image_id: &str) -> Option<StoredImageRecord> {
        self.index.lock().await.get(image_id).cloned()
    }

    pub async fn find_by_filename(&self, filename: &str) -> Option<StoredImageRecord> {
        self.index.lock().await.find_by_filename(filename).cloned()
    }

    /// Location of `filename` inside the output directory, if it is a safe
    /// image file name.
    pub fn path_for(&self, filename: &str) -> Option<PathBuf> {
        if is_plain_file_name(filename) && self.is_image_name(filename) {
            Some(self.output_dir.join(filename))
        } else {
            None
        }
    }

    /// Bytes of a stored image file.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self
            .path_for(filename)
            .ok_or_else(|| Prompt2ImageError::NotFound(filename.to_string()))?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Prompt2ImageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_record(&self, index: &mut MetadataIndex, image_id: &str) -> Result<bool> {
        let Some(record) = index.get(image_id).cloned() else {
            return Ok(false);
        };

        match tokio::fs::remove_file(self.output_dir.join(&record.filename)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("File {} was already gone", record.filename);
            }
            Err(e) => return Err(e.into()),
        }
        index.remove(image_id);
        log::info!("Deleted {}", record.filename);
        Ok(true)
    }

    fn unique_filename(&self, index: &MetadataIndex, prompt: &str, image_id: &str) -> String {
        let stem = file_stem(prompt, image_id);
        let mut candidate = format!("{}.{}", stem, IMAGE_EXTENSION);
        let mut counter = 1;

        while index.find_by_filename(&candidate).is_some()
            || self.output_dir.join(&candidate).exists()
        {
            candidate = format!("{}_{}.{}", stem, counter, IMAGE_EXTENSION);
            counter += 1;
        }
        candidate
    }

    fn is_image_name(&self, filename: &str) -> bool {
        dotted_extension(filename).map_or(false, |ext| self.allowed_extensions.contains(&ext))
    }

    async fn directory_usage(&self) -> Result<StorageInfo> {
        let mut files = 0;
        let mut bytes = 0;

        let mut entries = tokio::fs::read_dir(&self.output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !self.is_image_name(name) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                files += 1;
                bytes += meta.len();
            }
        }

        Ok(StorageInfo::from_totals(files, bytes))
    }
}

/// Run `cleanup(older_than_days)` every `period`, starting one period from now.
pub fn spawn_periodic_cleanup(
    store: Arc<ImageStore>,
    older_than_days: i64,
    period: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            match store.cleanup(older_than_days).await {
                Ok(0) => log::debug!("Periodic cleanup found nothing to remove"),
                Ok(n) => log::info!("🧹 Periodic cleanup removed {} images", n),
                Err(e) => log::error!("Periodic cleanup failed: {}", e),
            }
        }
    })
}
