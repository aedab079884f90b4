use std::path::PathBuf;

use common::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum UcError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("Cannot get class package of `{path}`: must be in format PACKAGE/Classes/CLASS.uc")]
    MissingPackage { path: PathBuf },
    #[error("No class declaration found")]
    MissingClassDeclaration,
    #[error("File is named `{file_classname}` but declares class `{classname}`")]
    ClassNameMismatch {
        file_classname: String,
        classname: String,
    },
    #[error("Expected {expected} in statement `{statement}`")]
    ExpectedToken {
        expected: &'static str,
        statement: String,
    },
    #[error("Missing closing `>` in type of statement `{statement}`")]
    UnclosedTypeBracket { statement: String },
    #[error("Type `{type_name}` is defined more than once (enum: {is_enum}, struct: {is_struct}, class: {is_class})")]
    AmbiguousType {
        type_name: String,
        is_enum: bool,
        is_struct: bool,
        is_class: bool,
    },
    #[error("Unknown type `{type_name}`")]
    UnknownType { type_name: String },
    #[error("Struct `{name}` contains itself")]
    RecursiveStruct { name: String },
    #[error("Class `{classname}` sets default property `{property}` without a matching variable")]
    UnknownDefaultProperty { classname: String, property: String },
    #[error("Class `{classname}` references more than one mesh: {names:?}")]
    MeshNameConflict {
        classname: String,
        names: Vec<String>,
    },
    #[error("Class `{classname}` inherits from itself")]
    InheritanceCycle { classname: String },
    #[error("In `{path}`: {source}")]
    InFile {
        #[source]
        source: Box<UcError>,
        path: PathBuf,
    },
}

impl UcError {
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
