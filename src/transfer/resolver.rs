//! Source path resolution and flat copying into the output directory

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::PlaylistError;

/// Root that absolute iTunes paths hang off on the authoring Mac
pub const DEFAULT_VOLUME_ROOT: &str = "/Volumes";

/// A playlist path mapped to a file on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Where the audio file is read from
    pub source: PathBuf,
    /// Base name it gets in the output directory
    pub file_name: OsString,
}

/// Outcome of routing one playlist entry through the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Path to write into the rewritten playlist, bytes kept as found
    pub file_name: OsString,
    /// Source that was (or would have been) copied
    pub source: PathBuf,
    /// Bytes copied, `None` if the copy failed
    pub copied: Option<u64>,
}

/// Resolves raw playlist paths and copies the files they name
#[derive(Debug, Clone)]
pub struct Resolver {
    input_dir: PathBuf,
    output_dir: PathBuf,
    volume_root: PathBuf,
}

impl Resolver {
    pub fn new(input_dir: PathBuf, output_dir: PathBuf, volume_root: PathBuf) -> Self {
        Self {
            input_dir,
            output_dir,
            volume_root,
        }
    }

    /// Map a raw playlist path to a source file
    ///
    /// A file that exists relative to the playlist always wins. Anything else
    /// is taken to live under the volume root, whether or not it exists.
    pub async fn resolve(&self, raw: &Path) -> ResolvedFile {
        let relative = self.input_dir.join(raw);
        let source = if is_file(&relative).await {
            relative
        } else {
            self.volume_root.join(raw)
        };

        let file_name = source
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();

        ResolvedFile { source, file_name }
    }

    /// Copy a resolved file into the output directory, overwriting any
    /// file of the same name
    pub async fn copy(&self, file: &ResolvedFile) -> Result<u64, PlaylistError> {
        let destination = self.output_dir.join(&file.file_name);
        fs::copy(&file.source, &destination)
            .await
            .map_err(|source| PlaylistError::CopyFailure {
                path: file.source.clone(),
                source,
            })
    }

    /// Resolve and copy one entry, downgrading a failed copy to a warning
    pub async fn relocate(&self, raw: &Path) -> Relocation {
        let resolved = self.resolve(raw).await;
        debug!("Copying: {}", resolved.source.display());

        let copied = match self.copy(&resolved).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        Relocation {
            file_name: resolved.file_name,
            source: resolved.source,
            copied,
        }
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
