use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("Missing closing quote `{quote}` opened at character {offset}")]
    UnterminatedQuote { quote: char, offset: usize },
    #[error("Unexpected `}}` without matching `{{` at character {offset}")]
    UnexpectedBlockClose { offset: usize },
    #[error("Missing closing `}}` ({depth} still open)")]
    UnclosedBlock { depth: usize },
    #[error("Bracket `{open}{close}` depth {depth} outside of {min}..={max} at token {index}")]
    BracketDepth {
        open: String,
        close: String,
        depth: i64,
        min: i64,
        max: i64,
        index: usize,
    },
    #[error("Bracket `{open}{close}` is not closed (depth {depth})")]
    UnbalancedBrackets {
        open: String,
        close: String,
        depth: i64,
    },
    #[error("Cannot parse `{value}` as {expected}")]
    ParseValue {
        value: String,
        expected: &'static str,
    },
    #[error("Unsupported image format `{path}`: must be .bmp, .tga or .png")]
    UnsupportedImage { path: PathBuf },
    #[error("Cannot parse image header of `{path}`")]
    ImageHeader { path: PathBuf },
    #[error("Cannot find `{asset_type}` folder in `{path}`")]
    MissingAssetFolder { asset_type: String, path: String },
    #[error("Cannot parse json `{path}`: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Cannot read file `{path}`: {source}")]
    IOError {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl CommonError {
    pub fn to_result<T>(self) -> Result<T, Self> {
        Err(self)
    }
}
