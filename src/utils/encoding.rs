//! Text encodings for tab-delimited playlists
//!
//! iTunes exports "Unicode Text" playlists as UTF-16 with a byte order mark.
//! `encoding_rs` covers decoding for every WHATWG label, but its encoders
//! only produce UTF-8 for the UTF-16 family, so those are encoded by hand.

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::PlaylistError;

/// Label used when no encoding is configured
pub const DEFAULT_ENCODING: &str = "utf-16";

const UTF_16LE_BOM: &[u8] = &[0xFF, 0xFE];

/// Encoding used to read and write a text playlist
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TextEncoding {
    /// UTF-16, byte order taken from the BOM (little endian without one).
    /// Written little endian with a BOM.
    #[default]
    Utf16,
    /// UTF-16 little endian, no BOM written
    Utf16Le,
    /// UTF-16 big endian, no BOM written
    Utf16Be,
    /// Any other WHATWG encoding
    Other(&'static Encoding),
}

impl FromStr for TextEncoding {
    type Err = PlaylistError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "utf-16" | "utf16" | "utf_16" => return Ok(Self::Utf16),
            "utf-16le" | "utf16le" | "utf_16_le" => return Ok(Self::Utf16Le),
            "utf-16be" | "utf16be" | "utf_16_be" => return Ok(Self::Utf16Be),
            _ => {}
        }

        match Encoding::for_label_no_replacement(normalized.as_bytes()) {
            Some(encoding) if encoding == UTF_16LE => Ok(Self::Utf16Le),
            Some(encoding) if encoding == UTF_16BE => Ok(Self::Utf16Be),
            Some(encoding) => Ok(Self::Other(encoding)),
            None => Err(PlaylistError::UnknownEncoding(label.to_string())),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf16 => f.write_str("UTF-16"),
            Self::Utf16Le => f.write_str("UTF-16LE"),
            Self::Utf16Be => f.write_str("UTF-16BE"),
            Self::Other(encoding) => f.write_str(encoding.name()),
        }
    }
}

impl TextEncoding {
    /// Incremental decoder that drops any byte order mark
    pub fn decoder(&self) -> TextDecoder {
        let decoder = match self {
            // BOM sniffing picks the byte order, little endian without one
            Self::Utf16 => UTF_16LE.new_decoder(),
            Self::Utf16Le => UTF_16LE.new_decoder_with_bom_removal(),
            Self::Utf16Be => UTF_16BE.new_decoder_with_bom_removal(),
            Self::Other(encoding) => encoding.new_decoder_with_bom_removal(),
        };

        TextDecoder {
            decoder,
            encoding: *self,
            had_errors: false,
        }
    }

    /// Decode a whole buffer at once
    #[cfg(test)]
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut text = String::new();
        self.decoder().push(bytes, true, &mut text);
        text
    }

    /// Bytes written once at the start of an output file
    pub fn bom(&self) -> &'static [u8] {
        match self {
            Self::Utf16 => UTF_16LE_BOM,
            _ => &[],
        }
    }

    /// Encode a chunk of text (no BOM)
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf16 | Self::Utf16Le => text
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            Self::Utf16Be => text
                .encode_utf16()
                .flat_map(|unit| unit.to_be_bytes())
                .collect(),
            Self::Other(encoding) => {
                let (bytes, _, unmappable) = encoding.encode(text);
                if unmappable {
                    warn!("Some characters cannot be represented in {}", self);
                }
                bytes.into_owned()
            }
        }
    }
}

/// Decodes a file chunk by chunk; characters split across chunks are carried
/// over to the next call
///
/// Malformed sequences become U+FFFD and are reported once, at the end.
pub struct TextDecoder {
    decoder: Decoder,
    encoding: TextEncoding,
    had_errors: bool,
}

impl TextDecoder {
    /// Decode `bytes` onto the end of `text`. `last` marks the end of input.
    pub fn push(&mut self, mut bytes: &[u8], last: bool, text: &mut String) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(bytes.len())
                .unwrap_or(bytes.len());
            text.reserve(needed);

            let (result, read, had_errors) = self.decoder.decode_to_string(bytes, text, last);
            self.had_errors |= had_errors;
            bytes = &bytes[read..];

            if matches!(result, CoderResult::InputEmpty) {
                break;
            }
        }

        if last && self.had_errors {
            warn!("Input is not valid {}, some characters were replaced", self.encoding);
        }
    }
}
