//! Source engine `.vmf` maps.
use std::{
    fs::OpenOptions,
    io::{self, BufWriter},
    path::Path,
};

use common::files::read_text;

mod block;
mod convert;
mod error;
mod types;
mod writer;

pub use block::{parse_blocks, Block};
pub use convert::{scene_to_vmf, DEFAULT_MATERIAL, DETAIL_CLASS};
pub use error::VmfError;
pub use types::*;
pub use writer::VmfWriter;

impl Vmf {
    pub fn from_text(text: &str) -> Result<Self, VmfError> {
        Self::from_blocks(&parse_blocks(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VmfError> {
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

        let mut writer = VmfWriter::new(BufWriter::new(file));

        writer.write_vmf(self)
    }
}
