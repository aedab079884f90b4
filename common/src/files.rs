use std::{
    fs,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::error::CommonError;

/// Windows-1252 code points for bytes 0x80..=0x9F. Undefined slots map to the C1 control.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

/// Decodes bytes as UTF-8 when valid, otherwise as Windows-1252.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.strip_prefix('\u{FEFF}').unwrap_or(text).to_string();
    }

    bytes
        .iter()
        .map(|&byte| match byte {
            0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
            _ => byte as char,
        })
        .collect()
}

/// Reads a whole text file. The handle is closed before returning.
pub fn read_text(path: impl AsRef<Path>) -> Result<String, CommonError> {
    let path = path.as_ref();

    let bytes = fs::read(path).map_err(|op_error| CommonError::IOError {
        source: op_error,
        path: path.to_path_buf(),
    })?;

    Ok(decode_text(&bytes))
}

/// Every file under `root` whose name ends with `suffix`, compared case-insensitively.
///
/// Returns `(file name, full path)` pairs sorted by path so scans are deterministic.
/// The suffix may span more than an extension, e.g. `_d.3d.obj`.
pub fn find_all_files(
    root: impl AsRef<Path>,
    suffix: &str,
) -> Result<Vec<(String, PathBuf)>, CommonError> {
    let root = root.as_ref();
    let suffix = suffix.to_lowercase();

    if !root.is_dir() {
        return CommonError::IOError {
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            path: root.to_path_buf(),
        }
        .to_result();
    }

    let mut res = vec![];

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|op_error| CommonError::IOError {
            path: op_error
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source: op_error.into(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();

        if file_name.to_lowercase().ends_with(&suffix) {
            res.push((file_name, entry.into_path()));
        }
    }

    Ok(res)
}
