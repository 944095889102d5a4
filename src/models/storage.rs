use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the metadata index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredImageRecord {
    pub image_id: String,
    pub filename: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// A stored image as listed by the gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub image_id: String,
    pub filename: String,
    pub url: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageInfo {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub average_size_mb: f64,
}

impl StorageInfo {
    pub fn from_totals(total_files: usize, total_size_bytes: u64) -> Self {
        let average = if total_files > 0 {
            total_size_bytes as f64 / total_files as f64
        } else {
            0.0
        };
        Self {
            total_files,
            total_size_bytes,
            total_size_mb: bytes_to_mb(total_size_bytes as f64),
            average_size_mb: bytes_to_mb(average),
        }
    }
}

/// Megabytes rounded to two decimals.
fn bytes_to_mb(bytes: f64) -> f64 {
    (bytes / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
