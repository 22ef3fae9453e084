//! CLI command handlers

use anyhow::{Context, Result};
use colored::Colorize;

use super::Cli;
use crate::config::Settings;
use crate::playlist::{self, Playlist, PlaylistFormat, PortOptions, RewriteSummary};
use crate::utils::encoding::TextEncoding;
use crate::utils::progress::Progress;

/// Handle a porting run
pub async fn port(cli: Cli) -> Result<()> {
    let playlist = Playlist::open(&cli.playlist)?;
    if let PlaylistFormat::Unsupported(extension) = &playlist.format {
        println!("{} {}", "Unrecognized format:".yellow(), extension);
        return Ok(());
    }

    let mut settings = Settings::load()?;
    if let Some(encoding) = cli.encoding {
        settings.encoding = encoding;
    }
    if let Some(volume_root) = cli.volume_root {
        settings.volume_root = volume_root;
    }

    // M3U files are copied as raw bytes and never look at the encoding
    let encoding = match playlist.format {
        PlaylistFormat::Tabular => settings.encoding.parse::<TextEncoding>()?,
        _ => TextEncoding::default(),
    };

    if cli.save_defaults {
        save_defaults(&settings)?;
    }

    let output_dir = cli
        .directory
        .unwrap_or_else(|| playlist.default_output_dir());

    println!(
        "Porting {} to {}",
        playlist.file_name.green(),
        output_dir.display()
    );

    let options = PortOptions {
        output_dir,
        volume_root: settings.volume_root,
        encoding,
    };
    let mut progress = if cli.quiet {
        Progress::hidden()
    } else {
        Progress::new(settings.progress_interval)
    };

    let summary = playlist::port(&playlist, &options, &mut progress).await?;
    print_summary(&summary);

    Ok(())
}

fn save_defaults(settings: &Settings) -> Result<()> {
    settings.encoding.parse::<TextEncoding>()?;

    let path = Settings::settings_path()
        .context("Could not determine config directory")?;
    settings.save_to(&path)?;
    println!("Saved defaults to {}", path.display());
    Ok(())
}

fn print_summary(summary: &RewriteSummary) {
    println!();
    println!("{}", "Playlist ported!".green().bold());
    println!("  Entries written: {}", summary.entries);
    println!("  Files copied: {}", summary.files_copied);
    println!(
        "  Total size: {:.1} MB",
        summary.bytes_copied as f64 / 1_048_576.0
    );

    if !summary.failed.is_empty() {
        println!(
            "{}",
            format!("  {} file(s) could not be copied:", summary.failed.len()).yellow()
        );
        for path in &summary.failed {
            println!("    - {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaylistError;
    use clap::Parser;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_playlist_reported_before_encoding() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("Gone.txt");
        let cli = Cli::try_parse_from([
            "playport",
            "-q",
            "-e",
            "klingon",
            missing.to_str().unwrap(),
        ])
        .unwrap();

        let err = port(cli).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PlaylistError>(),
            Some(PlaylistError::InputNotFound(path)) if *path == missing
        ));
    }

    #[tokio::test]
    async fn test_m3u_ignores_encoding() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("Song.mp3"), b"song").unwrap();
        let path = temp.path().join("Mix.m3u");
        std::fs::write(&path, b"#EXTM3U\rSong.mp3\r").unwrap();
        let output_dir = temp.path().join("out");

        let cli = Cli::try_parse_from([
            "playport",
            "-q",
            "-e",
            "klingon",
            "-d",
            output_dir.to_str().unwrap(),
            path.to_str().unwrap(),
        ])
        .unwrap();

        port(cli).await.unwrap();

        assert_eq!(
            std::fs::read(output_dir.join("Mix.m3u")).unwrap(),
            b"#EXTM3U\rSong.mp3\r"
        );
        assert!(output_dir.join("Song.mp3").exists());
    }
}
