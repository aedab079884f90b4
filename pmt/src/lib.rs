//! Per-engine databases and exporters behind one configured session.
use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod config;
pub mod export;
pub mod meshes;
pub mod session;

pub use catalog::MaterialCatalog;
pub use config::{parse_config, parse_config_from_file, Config, EnginePaths};
pub use export::{export_scene, load_scene, roundtrip};
pub use meshes::UnrealMeshDatabase;
pub use session::{MapSession, Session, T3dSession, VmfSession};

#[macro_export]
macro_rules! err {
    ($e: ident) => {{
        use eyre::eyre;

        Err(eyre!($e))
    }};

    ($format_string: literal) => {{
        use eyre::eyre;

        Err(eyre!($format_string))
    }};

    ($($arg:tt)*) => {{
        use eyre::eyre;

        Err(eyre!($($arg)*))
    }};
}

/// Target editor format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Source `.vmf`
    Vmf,
    /// Unreal Engine 1 `.t3d`
    T3d,
    /// idTech4 `.map`
    Map,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Vmf, Engine::T3d, Engine::Map];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vmf => "vmf",
            Self::T3d => "t3d",
            Self::Map => "map",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Engine of a level file by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();

        Self::ALL
            .into_iter()
            .find(|engine| engine.extension() == extension)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
