//! Output directory preparation

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Create `dir` if it is missing, otherwise delete everything inside it
///
/// Returns the number of entries removed.
pub async fn prepare(dir: &Path) -> Result<usize> {
    if !fs::try_exists(dir)
        .await
        .with_context(|| format!("Failed to inspect output directory {}", dir.display()))?
    {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        info!("Created directory: {}", dir.display());
        return Ok(0);
    }

    let mut removed = 0;
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list output directory {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;

        let removal = if file_type.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        removal.with_context(|| format!("Failed to delete {}", path.display()))?;

        debug!("Deleted: {}", entry.file_name().to_string_lossy());
        removed += 1;
    }

    info!("Deleted contents of: {}", dir.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_prepare_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Road Trip");

        let removed = prepare(&dir).await.unwrap();

        assert_eq!(removed, 0);
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_prepare_empties_existing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Road Trip");
        std::fs::create_dir_all(dir.join("stale-folder")).unwrap();
        std::fs::write(dir.join("old.mp3"), b"stale").unwrap();
        std::fs::write(dir.join("stale-folder").join("nested.mp3"), b"stale").unwrap();
        std::fs::write(dir.join("Road Trip.m3u"), b"#EXTM3U\r").unwrap();

        let removed = prepare(&dir).await.unwrap();

        assert_eq!(removed, 3);
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_prepare_fails_when_path_is_a_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        assert!(prepare(&file).await.is_err());
    }
}
