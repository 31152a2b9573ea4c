//! File-type classification: deciding whether a path is text-indexable.
//!
//! Combines an extension allow-list with binary-signature content
//! sniffing (null bytes, BOMs, common archive/image magic numbers) so a
//! file with a text-looking extension but binary content is still
//! rejected before it reaches the indexer.

use std::io::Read;
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".rst", ".log", ".csv", ".json", ".xml", ".html", ".htm", ".css", ".js", ".py",
    ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".rb", ".go", ".rs", ".php", ".sh", ".bat", ".ps1",
    ".yaml", ".yml", ".toml", ".ini", ".cfg", ".conf", ".properties",
];

/// Binary file signatures checked against the first bytes of a file.
const BINARY_SIGNATURES: &[&[u8]] = &[
    &[0x00, 0x00, 0xFE, 0xFF], // UTF-32 BE BOM
    &[0xFF, 0xFE, 0x00, 0x00], // UTF-32 LE BOM
    &[0xFE, 0xFF],             // UTF-16 BE BOM
    &[0xFF, 0xFE],             // UTF-16 LE BOM
    b"PK\x03\x04",
    b"PK\x05\x06",
    b"PK\x07\x08",
    &[0x1F, 0x8B],       // GZIP
    b"BZh",              // BZIP2
    &[0x89, b'P', b'N', b'G'], // PNG
    b"GIF87a",
    b"GIF89a",
    &[0xFF, 0xD8, 0xFF], // JPEG
    b"ID3",
    b"RIFF",
    b"%PDF",
];

const CONTENT_SAMPLE_SIZE: usize = 8 * 1024;

/// Returns the lower-cased extension of `path`, including the leading dot,
/// or `None` if the path has no extension.
fn lower_extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Extension allow-list gate.
#[must_use]
pub fn has_text_extension(path: &Path) -> bool {
    lower_extension(path).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Content-based gate: reads up to `CONTENT_SAMPLE_SIZE` bytes and rejects
/// known binary signatures, embedded null bytes, or bytes that decode as
/// neither UTF-8 nor Latin-1.
#[must_use]
pub fn is_text_content(sample: &[u8]) -> bool {
    if BINARY_SIGNATURES.iter().any(|sig| sample.starts_with(sig)) {
        return false;
    }
    if sample.contains(&0) {
        return false;
    }
    // Latin-1 maps every byte to a valid code point, so once the signature
    // and null-byte checks pass, decoding never fails.
    true
}

/// Full classifier: extension gate, then (optionally) content gate.
///
/// I/O failures while sampling content are treated as "not text" and logged
/// at debug level rather than propagated.
#[must_use]
pub fn is_text_file(path: &Path, check_content: bool) -> bool {
    if !has_text_extension(path) {
        return false;
    }
    if !check_content {
        return true;
    }

    let Ok(mut file) = std::fs::File::open(path) else {
        tracing::debug!(path = %path.display(), "classify: cannot open file for content sniff");
        return false;
    };

    let mut buf = vec![0u8; CONTENT_SAMPLE_SIZE];
    let read = match file.read(&mut buf) {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "classify: read failed");
            return false;
        }
    };
    buf.truncate(read);

    is_text_content(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extension_allow_list() {
        assert!(has_text_extension(Path::new("a.txt")));
        assert!(has_text_extension(Path::new("A.TXT")));
        assert!(has_text_extension(Path::new("main.rs")));
        assert!(!has_text_extension(Path::new("photo.png")));
        assert!(!has_text_extension(Path::new("no_extension")));
    }

    #[test]
    fn test_content_gate_rejects_null_bytes() {
        assert!(!is_text_content(b"hello\0world"));
    }

    #[test]
    fn test_content_gate_rejects_zip_signature() {
        assert!(!is_text_content(b"PK\x03\x04rest"));
    }

    #[test]
    fn test_content_gate_accepts_plain_text() {
        assert!(is_text_content(b"hello world"));
    }

    #[test]
    fn test_is_text_file_end_to_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "plain text content").unwrap();
        assert!(is_text_file(&path, true));

        let bin_path = dir.path().join("note.png");
        std::fs::write(&bin_path, [0x89, b'P', b'N', b'G']).unwrap();
        assert!(!is_text_file(&bin_path, true));
    }

    #[test]
    fn test_is_text_file_binary_content_wrong_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sneaky.txt");
        std::fs::write(&path, [0x00, 0x01, 0x02, 0x00]).unwrap();
        assert!(!is_text_file(&path, true));
    }

    #[test]
    fn test_is_text_file_skips_content_check_when_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sneaky.txt");
        std::fs::write(&path, [0x00, 0x01, 0x02, 0x00]).unwrap();
        assert!(is_text_file(&path, false));
    }
}
