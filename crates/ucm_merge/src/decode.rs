//! Raw bytes to normalized text.
//!
//! Script and text assets are mostly legacy Windows-1252 files, with the odd
//! UTF-16 file exported from an editor. Decoding never fails: invalid
//! sequences become U+FFFD. Line endings are normalized to `\n`.

use md5::Md5;
use sha2::{Digest, Sha256};
use ucm_settings::HashAlgorithm;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Which decoder was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf16Le,
    Utf16Be,
    Utf8Bom,
    Windows1252,
}

/// Windows-1252 mappings for 0x80..=0x9F. `None` marks the undefined code points.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Detect the encoding of `data` from its byte-order mark.
pub fn detect_encoding(data: &[u8]) -> SourceEncoding {
    match data {
        [0xFF, 0xFE, ..] => SourceEncoding::Utf16Le,
        [0xFE, 0xFF, ..] => SourceEncoding::Utf16Be,
        _ if data.starts_with(UTF8_BOM) => SourceEncoding::Utf8Bom,
        _ => SourceEncoding::Windows1252,
    }
}

/// Decode file bytes into text with `\n` line endings.
pub fn decode_text(data: &[u8]) -> String {
    let text = match detect_encoding(data) {
        SourceEncoding::Utf16Le => decode_utf16(&data[2..], u16::from_le_bytes),
        SourceEncoding::Utf16Be => decode_utf16(&data[2..], u16::from_be_bytes),
        SourceEncoding::Utf8Bom => String::from_utf8_lossy(&data[UTF8_BOM.len()..]).into_owned(),
        SourceEncoding::Windows1252 => decode_windows_1252(data),
    };

    normalize_line_endings(text)
}

fn decode_utf16(data: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units = data.chunks(2).map(|pair| match pair {
        [a, b] => to_unit([*a, *b]),
        // dangling odd byte
        _ => 0xFFFD,
    });

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

pub fn decode_windows_1252(data: &[u8]) -> String {
    data.iter()
        .map(|&byte| match byte {
            0x80..=0x9F => {
                CP1252_HIGH[(byte - 0x80) as usize].unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            _ => byte as char,
        })
        .collect()
}

fn normalize_line_endings(text: String) -> String {
    if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

/// Lowercase hex digest of the text's UTF-8 bytes.
///
/// Used to pin vanilla classes against unexpected upstream edits.
pub fn content_hash(text: &str, algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Md5 => hex::encode(Md5::digest(text.as_bytes())),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(text.as_bytes())),
    }
}
