//! Unreal Engine 1 `.t3d` maps.
use std::{
    fs::OpenOptions,
    io::{self, BufWriter},
    path::Path,
};

use common::files::read_text;

mod convert;
mod error;
mod parser;
mod types;
mod writer;

pub use convert::{builder_brush, scene_to_t3d, DEFAULT_MATERIAL};
pub use error::T3dError;
pub use parser::parse_t3d;
pub use types::*;
pub use writer::T3dWriter;

impl T3dMap {
    pub fn from_text(text: &str) -> Result<Self, T3dError> {
        parse_t3d(text)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, T3dError> {
        let path = path.as_ref();
        let text = read_text(path)?;

        Self::from_text(&text).map_err(|err| err.in_file(path))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = T3dWriter::new(BufWriter::new(file));

        writer.write_t3d(self)
    }
}
