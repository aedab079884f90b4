use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum DefError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("Expected {expected} for entityDef at token {index}")]
    ExpectedToken { expected: &'static str, index: usize },
    #[error("entityDef `{name}` has a key without value")]
    UnpairedKeyValue { name: String },
    #[error("entityDef `{name}` has unsupported editor key `{key}`")]
    UnsupportedEditorKey { name: String, key: String },
    #[error("entityDef `{name}` inherits from itself")]
    InheritanceCycle { name: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<DefError>,
        path: PathBuf,
    },
}

impl DefError {
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
