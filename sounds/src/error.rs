use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("Expected {expected} at token {index}")]
    ExpectedToken { expected: &'static str, index: usize },
    #[error("Unknown key `{key}` in `{name}` at token {index}")]
    UnknownKey {
        name: String,
        key: String,
        index: usize,
    },
    #[error("Parameter `{param}` of sound shader `{name}` has no value")]
    MissingValue { name: String, param: String },
    #[error("Sound shader `{name}` is defined more than once")]
    DuplicateShader { name: String },
    #[error("Unexpected manifest entry `{entry}`: must be `file` or `precache_file`")]
    UnknownManifestEntry { entry: String },
    #[error("`{name}` is both a soundscript and a soundscape")]
    AmbiguousSound { name: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<SoundError>,
        path: PathBuf,
    },
}

impl SoundError {
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
