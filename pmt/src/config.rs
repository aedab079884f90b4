//! Parses config file
use std::{
    env,
    fs::OpenOptions,
    io::Read,
    path::{Path, PathBuf},
};

use eyre::WrapErr;
use serde::Deserialize;

use crate::Engine;

pub static CONFIG_FILE_NAME: &str = "config.toml";

/// Written in place of a folder the engine does not have.
static NO_FOLDER: &str = "none";

/// Search folders of one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EnginePaths {
    /// `.fgd`, `.uc` or `.def` files
    pub classdefs: PathBuf,
    pub models: PathBuf,
    /// Unreal has no material files.
    pub materials: Option<PathBuf>,
    pub textures: PathBuf,
    /// `<style>/<category>.matlist.txt` files
    pub materialsets: PathBuf,
    pub sounds: PathBuf,
}

impl EnginePaths {
    pub fn defaults(engine: Engine) -> Self {
        let folder = |kind: &str| PathBuf::from(format!("c:/pmt/{kind}/{engine}/"));

        let materials = match engine {
            Engine::Vmf => Some(PathBuf::from("c:/pmt/materials/vmf/materials")),
            Engine::T3d => None,
            Engine::Map => Some(folder("materials")),
        };

        let textures = match engine {
            Engine::Vmf => PathBuf::from("c:/pmt/textures/vmf/materials"),
            _ => folder("textures"),
        };

        Self {
            classdefs: folder("classdefs"),
            models: folder("models"),
            materials,
            textures,
            materialsets: folder("materialsets"),
            sounds: folder("sounds"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawEnginePaths {
    classdefs: Option<String>,
    models: Option<String>,
    materials: Option<String>,
    textures: Option<String>,
    materialsets: Option<String>,
    sounds: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    vmf: RawEnginePaths,
    t3d: RawEnginePaths,
    map: RawEnginePaths,
}

fn resolve(root: &Path, value: Option<String>, default: PathBuf) -> PathBuf {
    match value {
        Some(value) => {
            let path = PathBuf::from(value);

            if path.is_relative() {
                root.join(path)
            } else {
                path
            }
        }
        None => default,
    }
}

impl RawEnginePaths {
    fn resolve(self, engine: Engine, root: &Path) -> EnginePaths {
        let defaults = EnginePaths::defaults(engine);

        let materials = match self.materials {
            Some(materials) if materials.trim().eq_ignore_ascii_case(NO_FOLDER) => None,
            Some(materials) => Some(resolve(root, Some(materials), PathBuf::new())),
            None => defaults.materials,
        };

        EnginePaths {
            classdefs: resolve(root, self.classdefs, defaults.classdefs),
            models: resolve(root, self.models, defaults.models),
            materials,
            textures: resolve(root, self.textures, defaults.textures),
            materialsets: resolve(root, self.materialsets, defaults.materialsets),
            sounds: resolve(root, self.sounds, defaults.sounds),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub vmf: EnginePaths,
    pub t3d: EnginePaths,
    pub map: EnginePaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vmf: EnginePaths::defaults(Engine::Vmf),
            t3d: EnginePaths::defaults(Engine::T3d),
            map: EnginePaths::defaults(Engine::Map),
        }
    }
}

impl Config {
    pub fn paths(&self, engine: Engine) -> &EnginePaths {
        match engine {
            Engine::Vmf => &self.vmf,
            Engine::T3d => &self.t3d,
            Engine::Map => &self.map,
        }
    }

    /// Relative paths are joined to `root`.
    pub fn from_toml(text: &str, root: &Path) -> eyre::Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;

        Ok(Self {
            vmf: raw.vmf.resolve(Engine::Vmf, root),
            t3d: raw.t3d.resolve(Engine::T3d, root),
            map: raw.map.resolve(Engine::Map, root),
        })
    }
}

/// Parse `config.toml` in the same folder as the binary
pub fn parse_config() -> eyre::Result<Config> {
    let path = match env::current_exe() {
        Ok(path) => path
            .parent()
            .map(|folder| folder.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        Err(_) => PathBuf::from(CONFIG_FILE_NAME),
    };

    parse_config_from_file(path.as_path())
}

pub fn parse_config_from_file(path: &Path) -> eyre::Result<Config> {
    let mut file = OpenOptions::new()
        .read(true)
        .open(path.as_os_str())
        .wrap_err_with(|| format!("Cannot open config `{}`", path.display()))?;
    let mut buffer = String::new();

    file.read_to_string(&mut buffer)?;

    let root = path.parent().unwrap_or(Path::new(""));

    Config::from_toml(&buffer, root).wrap_err_with(|| format!("In `{}`", path.display()))
}
