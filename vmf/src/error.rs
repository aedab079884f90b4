use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum VmfError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("Cannot parse vmf at line {line} near `{near}`")]
    Syntax { line: usize, near: String },
    #[error("More than one `world` block")]
    MultipleWorlds,
    #[error("`{block}` block is missing `{key}`")]
    MissingKey { block: &'static str, key: &'static str },
    #[error("Invalid `{key}` value `{value}`")]
    InvalidValue { key: String, value: String },
    #[error("Displacement power {power} is not 2, 3 or 4")]
    InvalidPower { power: u32 },
    #[error("Displacement `{field}` has {found} values, expected {expected}")]
    DisplacementSize {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Connection `{value}` of output `{output}` does not have 5 fields")]
    InvalidConnection { output: String, value: String },
    #[error("Primitive {primitive} (brush island {island}) has a zero length normal")]
    ZeroNormal { primitive: usize, island: i64 },
    #[error("Primitive {primitive} (brush island {island}) has {found} vertices, expected at least 3")]
    TooFewVertices {
        primitive: usize,
        island: i64,
        found: usize,
    },
    #[error("Key `{key}` of entity `{classname}` is set by the exporter")]
    RestrictedKey { classname: String, key: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<VmfError>,
        path: PathBuf,
    },
}

impl VmfError {
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
