use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum FgdError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("Expected `{expected}` in {context} at token {index}")]
    ExpectedToken {
        expected: &'static str,
        context: String,
        index: usize,
    },
    #[error("Concatenation `+` must join two quoted strings (token {index})")]
    DanglingConcatenation { index: usize },
    #[error("Default `{default}` of choices `{property}` in `{classname}` matches more than one choice")]
    AmbiguousChoiceDefault {
        classname: String,
        property: String,
        default: String,
    },
    #[error("Default `{default}` of choices `{property}` in `{classname}` matches no choice")]
    UnknownChoiceDefault {
        classname: String,
        property: String,
        default: String,
    },
    #[error("Default index {index} of choices `{property}` in `{classname}` is out of range ({count} choices)")]
    ChoiceIndexOutOfRange {
        classname: String,
        property: String,
        index: usize,
        count: usize,
    },
    #[error("Class `{classname}` inherits from itself")]
    InheritanceCycle { classname: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<FgdError>,
        path: PathBuf,
    },
}

impl FgdError {
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
