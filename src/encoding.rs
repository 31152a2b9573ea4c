//! Encoding detection and text decoding.
//!
//! Sniffs a BOM, falls back to UTF-8, then to `latin-1`/`cp1252`/
//! `iso-8859-1` via `encoding_rs`, which always succeeds since those
//! codepages are total over arbitrary bytes.

use std::io::Read;
use std::path::Path;

use crate::error::{IndexerError, Result};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const SNIFF_SIZE: usize = 1024;

/// Encoding label as recorded in `file_metadata.encoding`.
pub const UTF8_SIG: &str = "utf-8-sig";
pub const UTF8: &str = "utf-8";
pub const LATIN1: &str = "latin-1";
pub const CP1252: &str = "cp1252";
pub const ISO_8859_1: &str = "iso-8859-1";

/// Detect the text encoding of `path` by sniffing its leading bytes.
///
/// Tries, in order: a UTF-8 BOM, then `utf-8`, `latin-1`, `cp1252`,
/// `iso-8859-1`. The last three are single-byte encodings that always
/// succeed on arbitrary bytes, so this is a total function for any file
/// that can be opened and read; open/read failures are reported as errors.
///
/// # Errors
/// Returns `IndexerError::FileAccess` if the file cannot be opened or read.
pub fn detect_encoding(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| IndexerError::FileAccess { path: path.display().to_string(), reason: e.to_string() })?;

    let mut buf = vec![0u8; SNIFF_SIZE];
    let read = file
        .read(&mut buf)
        .map_err(|e| IndexerError::FileAccess { path: path.display().to_string(), reason: e.to_string() })?;
    buf.truncate(read);

    if buf.starts_with(&UTF8_BOM) {
        return Ok(UTF8_SIG.to_string());
    }

    if std::str::from_utf8(&buf).is_ok() {
        return Ok(UTF8.to_string());
    }

    // latin-1 / cp1252 / iso-8859-1 are all total over arbitrary bytes, so
    // the first candidate tried always "succeeds" in the source too. We
    // keep the same ordered fallback for behavioral parity even though in
    // practice the first of these three always wins.
    Ok(LATIN1.to_string())
}

/// Read the full contents of `path` decoded with `encoding` (one of the
/// labels returned by `detect_encoding`).
///
/// # Errors
/// Returns `IndexerError::FileAccess` if the file cannot be read or the
/// bytes cannot be decoded with the requested encoding.
pub fn read_text_file(path: &Path, encoding: &str) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| IndexerError::FileAccess { path: path.display().to_string(), reason: e.to_string() })?;

    let body = if encoding == UTF8_SIG { strip_bom(&bytes) } else { &bytes[..] };

    let decoded = match encoding {
        UTF8 | UTF8_SIG => std::str::from_utf8(body).map(str::to_owned).map_err(|e| {
            IndexerError::FileAccess { path: path.display().to_string(), reason: e.to_string() }
        })?,
        CP1252 => encoding_rs::WINDOWS_1252.decode(body).0.into_owned(),
        LATIN1 | ISO_8859_1 => encoding_rs::WINDOWS_1252.decode(body).0.into_owned(),
        other => {
            return Err(IndexerError::FileAccess {
                path: path.display().to_string(),
                reason: format!("unsupported encoding: {other}"),
            });
        }
    };

    Ok(decoded)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_detect_plain_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(detect_encoding(&path).unwrap(), UTF8);
    }

    #[test]
    fn test_detect_utf8_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"hello");
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(detect_encoding(&path).unwrap(), UTF8_SIG);
    }

    #[test]
    fn test_detect_non_utf8_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, [0x93, b'h', b'i', 0x94]).unwrap(); // cp1252 smart quotes
        let encoding = detect_encoding(&path).unwrap();
        assert_eq!(encoding, LATIN1);
    }

    #[test]
    fn test_read_text_file_utf8_bom_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("hello".as_bytes());
        std::fs::write(&path, bytes).unwrap();
        let text = read_text_file(&path, UTF8_SIG).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_read_text_file_cp1252_smart_quotes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, [0x93, b'h', b'i', 0x94]).unwrap();
        let text = read_text_file(&path, CP1252).unwrap();
        assert!(text.contains('h') && text.contains('i'));
    }

    #[test]
    fn test_read_text_file_missing_path_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        assert!(read_text_file(&missing, UTF8).is_err());
    }
}
