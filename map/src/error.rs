use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("Missing `Version 2` header")]
    MissingVersion,
    #[error("Cannot parse map at line {line} near `{near}`")]
    Syntax { line: usize, near: String },
    #[error("Primitive {primitive} (brush island {island}) has a zero length normal")]
    ZeroNormal { primitive: usize, island: i64 },
    #[error("Primitive {primitive} (brush island {island}) has no vertices")]
    NoVertices { primitive: usize, island: i64 },
    #[error("Primitive {primitive} (brush island {island}) has a zero uv scale")]
    InvalidUvScale { primitive: usize, island: i64 },
    #[error("Texture size {width}x{height} of `{material}` is below 1 (primitive {primitive}, brush island {island})")]
    InvalidTextureSize {
        material: String,
        width: f64,
        height: f64,
        primitive: usize,
        island: i64,
    },
    #[error("Patch primitive {primitive} has {found} vertices, expected {width}x{height}")]
    PatchSize {
        primitive: usize,
        width: usize,
        height: usize,
        found: usize,
    },
    #[error("Key `{key}` of point entity `{classname}` is set by the exporter")]
    RestrictedKey { classname: String, key: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<MapError>,
        path: PathBuf,
    },
}

impl MapError {
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
