//! Tab-delimited playlists ("Unicode Text" export from iTunes)
//!
//! The first row names the columns. The `Location` column holds an HFS style
//! path such as `Macintosh HD:Users:me:Music:song.mp3`; only that column is
//! rewritten, every other value is written back untouched.

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::path::{Path, MAIN_SEPARATOR_STR};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::RewriteSummary;
use crate::error::{PlaylistError, Result};
use crate::transfer::Resolver;
use crate::utils::encoding::{TextDecoder, TextEncoding};
use crate::utils::progress::Progress;

/// Column holding the track path
pub const LOCATION_COLUMN: &str = "Location";

const DELIMITER: u8 = b'\t';

const READ_CHUNK: usize = 8 * 1024;

/// Turn a `:`-separated location into a native path string
pub fn native_path(location: &str) -> String {
    location.replace(':', MAIN_SEPARATOR_STR)
}

/// Rewrite `input` into `output` one record at a time, copying each record's
/// track through `resolver`. Both files use `encoding`.
///
/// Values are plain text between tabs; quotes carry no meaning and are
/// written back as found.
pub async fn rewrite(
    input: &Path,
    output: &Path,
    encoding: TextEncoding,
    resolver: &Resolver,
    progress: &mut Progress,
) -> Result<RewriteSummary> {
    let mut reader = RecordReader::open(input, encoding).await?;
    let headers = reader.next_record().await?.unwrap_or_default();
    let location = headers
        .iter()
        .position(|name| name == LOCATION_COLUMN)
        .ok_or_else(|| PlaylistError::MissingColumn(LOCATION_COLUMN.to_string()))?;

    let mut writer = RecordWriter::create(output, encoding, reader.terminator()).await?;
    writer.write(&headers).await?;

    let mut summary = RewriteSummary::default();
    while let Some(record) = reader.next_record().await? {
        let path = record
            .get(location)
            .filter(|value| !value.is_empty())
            .map(native_path);

        let rewritten = match path {
            Some(path) => {
                let relocation = resolver.relocate(Path::new(&path)).await;
                summary.record(&relocation);
                replace_field(&record, location, &relocation.file_name.to_string_lossy())
            }
            None => {
                warn!(
                    "Record on line {} has no {}, writing it unchanged",
                    reader.line_number(),
                    LOCATION_COLUMN
                );
                summary.entries += 1;
                record
            }
        };

        writer.write(&rewritten).await?;
        progress.tick();
    }

    writer.finish().await?;
    debug!("Rewrote {} records into {}", summary.entries, output.display());
    Ok(summary)
}

fn replace_field(record: &StringRecord, index: usize, value: &str) -> StringRecord {
    record
        .iter()
        .enumerate()
        .map(|(i, field)| if i == index { value } else { field })
        .collect()
}

/// Map a line break to the writer's terminator; CRLF when there is none
fn detect_terminator(line_break: &str) -> Terminator {
    match line_break.as_bytes() {
        [b'\r', b'\n', ..] | [] => Terminator::CRLF,
        [byte, ..] => Terminator::Any(*byte),
    }
}

/// Reads decoded lines off the input and splits each into a record
struct RecordReader {
    builder: ReaderBuilder,
    file: File,
    chunk: Vec<u8>,
    decoder: TextDecoder,
    pending: String,
    eof: bool,
    line_number: u64,
    first_break: Option<String>,
}

impl RecordReader {
    async fn open(path: &Path, encoding: TextEncoding) -> Result<Self> {
        let file = File::open(path).await?;

        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(DELIMITER)
            .quoting(false)
            .has_headers(false)
            .flexible(true);

        Ok(Self {
            builder,
            file,
            chunk: vec![0; READ_CHUNK],
            decoder: encoding.decoder(),
            pending: String::new(),
            eof: false,
            line_number: 0,
            first_break: None,
        })
    }

    /// Next non-empty record, `None` at end of input
    async fn next_record(&mut self) -> Result<Option<StringRecord>> {
        while let Some(line) = self.next_line().await? {
            let mut parser = self.builder.from_reader(line.as_bytes());
            let mut record = StringRecord::new();
            if parser.read_record(&mut record)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Line the last record was read from
    fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Terminator matching the first line break seen so far
    fn terminator(&self) -> Terminator {
        detect_terminator(self.first_break.as_deref().unwrap_or_default())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some((end, break_len)) = self.line_break() {
                if self.first_break.is_none() {
                    self.first_break = Some(self.pending[end..end + break_len].to_string());
                }
                let line = self.pending[..end].to_string();
                self.pending.replace_range(..end + break_len, "");
                self.line_number += 1;
                return Ok(Some(line));
            }

            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                self.line_number += 1;
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            let read = self.file.read(&mut self.chunk).await?;
            self.eof = read == 0;
            self.decoder
                .push(&self.chunk[..read], self.eof, &mut self.pending);
        }
    }

    /// Offset and length of the first complete line break in `pending`
    fn line_break(&self) -> Option<(usize, usize)> {
        let index = self.pending.find(['\r', '\n'])?;
        match &self.pending.as_bytes()[index..] {
            [b'\r', b'\n', ..] => Some((index, 2)),
            // `\n` may still arrive with the next chunk
            [b'\r'] if !self.eof => None,
            _ => Some((index, 1)),
        }
    }
}

/// Serializes records with `csv` and transcodes each one to the output
/// encoding as it is written
struct RecordWriter {
    builder: WriterBuilder,
    out: BufWriter<File>,
    encoding: TextEncoding,
}

impl RecordWriter {
    async fn create(path: &Path, encoding: TextEncoding, terminator: Terminator) -> Result<Self> {
        let mut out = BufWriter::new(File::create(path).await?);
        out.write_all(encoding.bom()).await?;

        let mut builder = WriterBuilder::new();
        builder
            .delimiter(DELIMITER)
            .terminator(terminator)
            .quote_style(QuoteStyle::Never)
            .flexible(true);

        Ok(Self {
            builder,
            out,
            encoding,
        })
    }

    async fn write(&mut self, record: &StringRecord) -> Result<()> {
        let mut line = Vec::new();
        {
            let mut record_writer = self.builder.from_writer(&mut line);
            record_writer.write_record(record)?;
            record_writer.flush()?;
        }

        let line = String::from_utf8_lossy(&line);
        self.out.write_all(&self.encoding.encode(&line)).await?;
        Ok(())
    }

    async fn finish(mut self) -> Result<()> {
        self.out.flush().await?;
        Ok(())
    }
}
