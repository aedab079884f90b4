//! idTech4 `.map` files: `brushDef3` brushes and `patchDef2`/`patchDef3` patches.
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

pub use convert::{scene_to_map, texture_matrix, DEFAULT_MATERIAL};
pub use error::MapError;
pub use parser::parse_map;
pub use types::*;
pub use writer::MapWriter;

impl Map {
    pub fn from_text(text: &str) -> Result<Self, MapError> {
        parse_map(text)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = read_text(path)?;

        parse_map(&text).map_err(|err| err.in_file(path))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = MapWriter::new(BufWriter::new(file));

        writer.write_map(self)
    }
}
