//! M3U playlists as exported by iTunes
//!
//! Lines are separated by a bare carriage return:
//!
//! ```text
//! #EXTM3U\r
//! #EXTINF:258,Can't Hold Us - Macklemore & Ryan Lewis\r
//! /Users/tyler/Music/iTunes/iTunes Media/Music/Macklemore/The Heist/02 Can't Hold Us.mp3\r
//! ```
//!
//! Directives are copied byte for byte, every other line is a track path that
//! gets replaced by the base name of its copy. Paths are never decoded, so
//! Latin-1 or Mac Roman names still match the files they point at.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use super::RewriteSummary;
use crate::error::Result;
use crate::transfer::Resolver;
use crate::utils::progress::Progress;

/// Line separator used for both input and output
pub const LINE_SEPARATOR: u8 = b'\r';

/// First byte of a directive line
pub const DIRECTIVE_MARKER: u8 = b'#';

/// One logical M3U line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum M3uEntry<'a> {
    /// `#`-prefixed line, kept verbatim
    Directive(&'a [u8]),
    /// Trimmed track path
    Track(PathBuf),
}

impl<'a> M3uEntry<'a> {
    /// Classify a line; `None` for lines with nothing in them
    pub fn parse(line: &'a [u8]) -> Option<Self> {
        if line.first() == Some(&DIRECTIVE_MARKER) {
            return Some(Self::Directive(line));
        }

        let path = line.trim_ascii();
        if path.is_empty() {
            None
        } else {
            Some(Self::Track(track_path(path)))
        }
    }
}

#[cfg(unix)]
fn track_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn track_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Rewrite `input` into `output` one line at a time, copying each track
/// through `resolver`
pub async fn rewrite(
    input: &Path,
    output: &Path,
    resolver: &Resolver,
    progress: &mut Progress,
) -> Result<RewriteSummary> {
    let mut lines = BufReader::new(File::open(input).await?).split(LINE_SEPARATOR);
    let mut writer = BufWriter::new(File::create(output).await?);
    let mut summary = RewriteSummary::default();
    let mut line_number = 0;

    while let Some(line) = lines.next_segment().await? {
        line_number += 1;
        let Some(entry) = M3uEntry::parse(&line) else {
            if !line.is_empty() {
                debug!("Skipping line {}, it only holds whitespace", line_number);
            }
            continue;
        };

        match entry {
            M3uEntry::Directive(directive) => {
                writer.write_all(directive).await?;
            }
            M3uEntry::Track(path) => {
                let relocation = resolver.relocate(&path).await;
                writer
                    .write_all(relocation.file_name.as_encoded_bytes())
                    .await?;
                summary.record(&relocation);
                progress.tick();
            }
        }
        writer.write_u8(LINE_SEPARATOR).await?;
    }

    writer.flush().await?;
    debug!("Rewrote {} M3U entries into {}", summary.entries, output.display());
    Ok(summary)
}
