//! CLI module for playport

use clap::Parser;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "playport",
    about = "Read an iTunes m3u or txt playlist, copy the music files, and create a new portable playlist"
)]
#[command(version)]
pub struct Cli {
    /// Playlist to port (.m3u or tab-delimited .txt)
    #[arg(value_name = "PLAYLIST")]
    pub playlist: PathBuf,

    /// Enable verbose logging (every copied and deleted file)
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide progress markers
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory to output to (default: next to the playlist, named after it)
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Encoding of tab-delimited playlists, used for reading and writing
    #[arg(short, long, env = "PLAYPORT_ENCODING")]
    pub encoding: Option<String>,

    /// Root that paths missing next to the playlist are looked up under
    #[arg(long, env = "PLAYPORT_VOLUME_ROOT", value_name = "DIR")]
    pub volume_root: Option<PathBuf>,

    /// Store the effective encoding and volume root as future defaults
    #[arg(long)]
    pub save_defaults: bool,
}
