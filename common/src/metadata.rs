//! JSON side files stored next to an image as `<image>.analyze.txt` and `<image>.tags.txt`.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};

use crate::error::CommonError;

pub type Metadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Analyze,
    Tags,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Tags => "tags",
        }
    }
}

pub fn metadata_path(image_path: &Path, kind: MetadataKind) -> PathBuf {
    let mut path = image_path.as_os_str().to_owned();
    path.push(format!(".{}.txt", kind.as_str()));
    PathBuf::from(path)
}

/// Loads the side file. A missing file is an empty map.
pub fn load_metadata(image_path: &Path, kind: MetadataKind) -> Result<Metadata, CommonError> {
    let path = metadata_path(image_path, kind);

    if !path.exists() {
        return Ok(Metadata::new());
    }

    let bytes = fs::read(&path).map_err(|op_error| CommonError::IOError {
        source: op_error,
        path: path.clone(),
    })?;

    serde_json::from_slice(&bytes).map_err(|op_error| CommonError::Json {
        source: op_error,
        path,
    })
}

/// Writes the side file with tab indentation and sorted keys.
pub fn save_metadata(
    image_path: &Path,
    kind: MetadataKind,
    metadata: &Metadata,
) -> Result<(), CommonError> {
    let path = metadata_path(image_path, kind);

    let mut out = vec![];
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));

    metadata
        .serialize(&mut serializer)
        .map_err(|op_error| CommonError::Json {
            source: op_error,
            path: path.clone(),
        })?;

    fs::write(&path, out).map_err(|op_error| CommonError::IOError {
        source: op_error,
        path,
    })
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");

        assert!(load_metadata(&image, MetadataKind::Tags).unwrap().is_empty());
        assert!(metadata_path(&image, MetadataKind::Tags)
            .to_string_lossy()
            .ends_with("a.png.tags.txt"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");

        let mut metadata = Metadata::new();
        metadata.insert("width".to_string(), json!(64));
        metadata.insert("color".to_string(), json!([1, 2, 3]));

        save_metadata(&image, MetadataKind::Analyze, &metadata).unwrap();

        let text = fs::read_to_string(metadata_path(&image, MetadataKind::Analyze)).unwrap();

        assert!(text.starts_with("{\n\t\"color\""));
        assert_eq!(load_metadata(&image, MetadataKind::Analyze).unwrap(), metadata);
    }

    #[test]
    fn malformed_json_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.bmp");
        fs::write(metadata_path(&image, MetadataKind::Tags), "{ nope").unwrap();

        let err = load_metadata(&image, MetadataKind::Tags).unwrap_err();

        assert!(matches!(err, CommonError::Json { .. }));
        assert!(err.to_string().contains("a.bmp.tags.txt"));
    }
}
