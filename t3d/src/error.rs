use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum T3dError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("File does not start with `Begin Map`")]
    MissingBeginMap,
    #[error("File does not end with `End Map`")]
    MissingEndMap,
    #[error("Cannot parse line {line}: `{text}`")]
    Syntax { line: usize, text: String },
    #[error("`Begin {block}` at line {line} is never closed")]
    Unclosed { block: String, line: usize },
    #[error("Primitive {primitive} (brush island {island}) has a zero length normal")]
    ZeroNormal { primitive: usize, island: i64 },
    #[error("Primitive {primitive} (brush island {island}) has {found} vertices, expected at least 3")]
    TooFewVertices {
        primitive: usize,
        island: i64,
        found: usize,
    },
    #[error("Primitive {primitive} (brush island {island}) has a zero uv scale")]
    InvalidUvScale { primitive: usize, island: i64 },
    #[error("Primitive {primitive} (brush island {island}) has uv data but no texture size")]
    MissingTextureSize { primitive: usize, island: i64 },
    #[error("Key `{key}` of actor `{class}` is set by the exporter")]
    RestrictedKey { class: String, key: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<T3dError>,
        path: PathBuf,
    },
}

impl T3dError {
    pub fn to_result<T>(self) -> Result<T, Self> {
        Err(self)
    }

    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            source: Box::new(self),
            path: path.into(),
        }
    }
}
