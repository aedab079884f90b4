use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<MaterialError>,
        path: PathBuf,
    },
}

impl MaterialError {
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
