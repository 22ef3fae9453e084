//! Playlist formats and the porting entry point

pub mod m3u;
pub mod tabular;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::PlaylistError;
use crate::transfer::{output, Relocation, Resolver};
use crate::utils::encoding::TextEncoding;
use crate::utils::progress::Progress;

/// Playlist format, chosen from the file extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistFormat {
    /// `\r`-delimited M3U as written by iTunes
    M3u,
    /// Tab-delimited iTunes "Unicode Text" export
    Tabular,
    /// Anything else; holds the extension as written (e.g. `.wpl`)
    Unsupported(String),
}

impl PlaylistFormat {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "m3u" => Self::M3u,
            "txt" => Self::Tabular,
            "" => Self::Unsupported(String::new()),
            _ => Self::Unsupported(format!(".{}", extension)),
        }
    }
}

/// An input playlist on disk
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Path as given
    pub path: PathBuf,
    /// Directory relative track paths are looked up in
    pub input_dir: PathBuf,
    /// File name, reused for the rewritten playlist
    pub file_name: String,
    /// File name without extension
    pub name: String,
    pub format: PlaylistFormat,
}

impl Playlist {
    /// Inspect a playlist path; fails if nothing exists there
    pub fn open(path: &Path) -> Result<Self, PlaylistError> {
        if !path.exists() {
            return Err(PlaylistError::InputNotFound(path.to_path_buf()));
        }

        let input_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            format: PlaylistFormat::from_path(path),
            path: path.to_path_buf(),
            input_dir,
            file_name,
            name,
        })
    }

    /// Sibling directory named after the playlist
    pub fn default_output_dir(&self) -> PathBuf {
        self.input_dir.join(&self.name)
    }

    /// Where the rewritten playlist goes inside `output_dir`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.file_name)
    }
}

/// Settings for one porting run
#[derive(Debug, Clone)]
pub struct PortOptions {
    pub output_dir: PathBuf,
    pub volume_root: PathBuf,
    /// Only used for tab-delimited playlists
    pub encoding: TextEncoding,
}

/// Totals for one rewritten playlist
#[derive(Debug, Default)]
pub struct RewriteSummary {
    /// Track entries written to the new playlist
    pub entries: usize,
    pub files_copied: usize,
    pub bytes_copied: u64,
    /// Sources that could not be copied
    pub failed: Vec<PathBuf>,
}

impl RewriteSummary {
    /// Account for one relocated entry
    pub fn record(&mut self, relocation: &Relocation) {
        self.entries += 1;
        match relocation.copied {
            Some(bytes) => {
                self.files_copied += 1;
                self.bytes_copied += bytes;
            }
            None => self.failed.push(relocation.source.clone()),
        }
    }
}

/// Copy every track of `playlist` into the output directory and write the
/// rewritten playlist next to them
pub async fn port(
    playlist: &Playlist,
    options: &PortOptions,
    progress: &mut Progress,
) -> Result<RewriteSummary> {
    let summary = match &playlist.format {
        PlaylistFormat::M3u => {
            let (resolver, output_path) = prepare(playlist, options).await?;
            m3u::rewrite(&playlist.path, &output_path, &resolver, progress).await
        }
        PlaylistFormat::Tabular => {
            let (resolver, output_path) = prepare(playlist, options).await?;
            tabular::rewrite(
                &playlist.path,
                &output_path,
                options.encoding,
                &resolver,
                progress,
            )
            .await
        }
        PlaylistFormat::Unsupported(extension) => {
            return Err(PlaylistError::UnsupportedFormat(extension.clone()).into());
        }
    }
    .with_context(|| format!("Failed to rewrite {}", playlist.path.display()))?;

    progress.finish();
    Ok(summary)
}

/// Clear the output directory and build the resolver for this run
async fn prepare(playlist: &Playlist, options: &PortOptions) -> Result<(Resolver, PathBuf)> {
    ensure_outside(&playlist.path, &options.output_dir).await?;
    output::prepare(&options.output_dir).await?;

    let resolver = Resolver::new(
        playlist.input_dir.clone(),
        options.output_dir.clone(),
        options.volume_root.clone(),
    );
    let output_path = playlist.output_path(&options.output_dir);
    debug!("Writing playlist to {}", output_path.display());

    Ok((resolver, output_path))
}

/// Emptying the output directory must never delete the input playlist
async fn ensure_outside(playlist: &Path, output_dir: &Path) -> Result<()> {
    let Ok(output_dir) = fs::canonicalize(output_dir).await else {
        // Not created yet, so it cannot hold the playlist
        return Ok(());
    };
    let playlist = fs::canonicalize(playlist)
        .await
        .with_context(|| format!("Failed to resolve {}", playlist.display()))?;

    if playlist.starts_with(&output_dir) {
        anyhow::bail!(
            "Output directory {} contains the input playlist; choose another with --directory",
            output_dir.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options_for(playlist: &Playlist, volume_root: &Path) -> PortOptions {
        PortOptions {
            output_dir: playlist.default_output_dir(),
            volume_root: volume_root.to_path_buf(),
            encoding: TextEncoding::Utf16,
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(PlaylistFormat::from_path(Path::new("a/Mix.m3u")), PlaylistFormat::M3u);
        assert_eq!(PlaylistFormat::from_path(Path::new("Mix.M3U")), PlaylistFormat::M3u);
        assert_eq!(PlaylistFormat::from_path(Path::new("Mix.txt")), PlaylistFormat::Tabular);
        assert_eq!(
            PlaylistFormat::from_path(Path::new("Mix.wpl")),
            PlaylistFormat::Unsupported(".wpl".to_string())
        );
        assert_eq!(
            PlaylistFormat::from_path(Path::new("Mix")),
            PlaylistFormat::Unsupported(String::new())
        );
    }

    #[test]
    fn test_open_missing_playlist() {
        let temp = TempDir::new().unwrap();
        let err = Playlist::open(&temp.path().join("Gone.m3u")).unwrap_err();
        assert!(matches!(err, PlaylistError::InputNotFound(_)));
    }

    #[test]
    fn test_open_derives_names() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Road Trip.m3u");
        std::fs::write(&path, b"#EXTM3U\r").unwrap();

        let playlist = Playlist::open(&path).unwrap();

        assert_eq!(playlist.input_dir, temp.path());
        assert_eq!(playlist.file_name, "Road Trip.m3u");
        assert_eq!(playlist.name, "Road Trip");
        assert_eq!(playlist.default_output_dir(), temp.path().join("Road Trip"));
        assert_eq!(
            playlist.output_path(Path::new("/tmp/out")),
            PathBuf::from("/tmp/out/Road Trip.m3u")
        );
    }

    #[tokio::test]
    async fn test_unsupported_format_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Mix.wpl");
        std::fs::write(&path, b"<smil/>").unwrap();
        let playlist = Playlist::open(&path).unwrap();
        let options = options_for(&playlist, temp.path());

        let err = port(&playlist, &options, &mut Progress::hidden()).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PlaylistError>(),
            Some(PlaylistError::UnsupportedFormat(ext)) if ext == ".wpl"
        ));
        assert!(!options.output_dir.exists());
    }

    #[tokio::test]
    async fn test_port_m3u_end_to_end() {
        let temp = TempDir::new().unwrap();
        let music = temp.path().join("Music");
        std::fs::create_dir_all(&music).unwrap();
        std::fs::write(music.join("One.mp3"), b"one").unwrap();
        std::fs::write(music.join("Two.mp3"), b"two!").unwrap();

        let path = temp.path().join("Mix.m3u");
        std::fs::write(&path, b"#EXTM3U\rMusic/One.mp3\rMusic/Two.mp3\r").unwrap();
        let playlist = Playlist::open(&path).unwrap();
        let options = options_for(&playlist, temp.path());

        let summary = port(&playlist, &options, &mut Progress::hidden()).await.unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.files_copied, 2);
        assert_eq!(summary.bytes_copied, 7);
        assert!(summary.failed.is_empty());
        assert_eq!(
            std::fs::read(options.output_dir.join("Mix.m3u")).unwrap(),
            b"#EXTM3U\rOne.mp3\rTwo.mp3\r"
        );
    }

    #[tokio::test]
    async fn test_rerun_removes_stale_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Song.mp3"), b"song").unwrap();
        let path = temp.path().join("Mix.m3u");
        std::fs::write(&path, b"Song.mp3\r").unwrap();
        let playlist = Playlist::open(&path).unwrap();
        let options = options_for(&playlist, temp.path());

        std::fs::create_dir_all(&options.output_dir).unwrap();
        std::fs::write(options.output_dir.join("Leftover.mp3"), b"old").unwrap();

        port(&playlist, &options, &mut Progress::hidden()).await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&options.output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Mix.m3u", "Song.mp3"]);
    }

    #[tokio::test]
    async fn test_refuses_output_directory_holding_the_playlist() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Mix.m3u");
        std::fs::write(&path, b"#EXTM3U\r").unwrap();
        let playlist = Playlist::open(&path).unwrap();
        let options = PortOptions {
            output_dir: temp.path().to_path_buf(),
            volume_root: temp.path().to_path_buf(),
            encoding: TextEncoding::Utf16,
        };

        assert!(port(&playlist, &options, &mut Progress::hidden()).await.is_err());
        assert!(path.exists());
    }
}
