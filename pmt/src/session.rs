//! Every database an engine needs, built from the configured folders.
use def::DefDatabase;
use eyre::WrapErr;
use fgd::FgdDatabase;
use log::info;
use materials::{scan_mtr, scan_vmt, MaterialDatabase, UnrealTextureDatabase};
use sounds::{SoundScriptDatabase, SoundShaderDatabase, UnrealSoundDatabase};
use uc::UcDatabase;

use crate::{catalog::MaterialCatalog, config::EnginePaths, Config, Engine, UnrealMeshDatabase};

pub struct VmfSession {
    pub classes: FgdDatabase,
    pub materials: MaterialDatabase,
    pub sounds: SoundScriptDatabase,
    pub catalog: MaterialCatalog,
}

impl VmfSession {
    pub fn load(paths: &EnginePaths) -> eyre::Result<Self> {
        let classes = FgdDatabase::scan(&paths.classdefs).wrap_err("Cannot load fgd classes")?;

        let materials = match &paths.materials {
            Some(materials) => scan_vmt(materials, Some(paths.textures.as_path()))
                .wrap_err("Cannot load vmt materials")?,
            None => MaterialDatabase::default(),
        };

        let sounds = SoundScriptDatabase::scan(&paths.sounds).wrap_err("Cannot load soundscripts")?;
        let catalog =
            MaterialCatalog::scan(&paths.materialsets).wrap_err("Cannot load material sets")?;

        Ok(Self {
            classes,
            materials,
            sounds,
            catalog,
        })
    }

    pub fn summary(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("classes", self.classes.len()),
            ("materials", self.materials.len()),
            ("soundscripts", self.sounds.soundscripts.len()),
            ("soundscapes", self.sounds.soundscapes.len()),
            ("sound files", self.sounds.files.len()),
            ("material styles", self.catalog.len()),
        ]
    }
}

pub struct T3dSession {
    pub classes: UcDatabase,
    pub textures: UnrealTextureDatabase,
    pub sounds: UnrealSoundDatabase,
    pub meshes: UnrealMeshDatabase,
    pub catalog: MaterialCatalog,
}

impl T3dSession {
    pub fn load(paths: &EnginePaths) -> eyre::Result<Self> {
        Ok(Self {
            classes: UcDatabase::scan(&paths.classdefs).wrap_err("Cannot load uc classes")?,
            textures: UnrealTextureDatabase::scan(&paths.textures)
                .wrap_err("Cannot load unreal textures")?,
            sounds: UnrealSoundDatabase::scan(&paths.sounds).wrap_err("Cannot load unreal sounds")?,
            meshes: UnrealMeshDatabase::scan(&paths.models).wrap_err("Cannot load unreal meshes")?,
            catalog: MaterialCatalog::scan(&paths.materialsets)
                .wrap_err("Cannot load material sets")?,
        })
    }

    pub fn summary(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("classes", self.classes.len()),
            ("textures", self.textures.len()),
            ("sounds", self.sounds.len()),
            ("meshes", self.meshes.len()),
            ("material styles", self.catalog.len()),
        ]
    }
}

pub struct MapSession {
    pub classes: DefDatabase,
    pub materials: MaterialDatabase,
    pub sounds: SoundShaderDatabase,
    pub catalog: MaterialCatalog,
}

impl MapSession {
    /// Sound shaders and the sound files they play share the sounds folder.
    pub fn load(paths: &EnginePaths) -> eyre::Result<Self> {
        let classes = DefDatabase::scan(&paths.classdefs).wrap_err("Cannot load entity defs")?;

        let materials = match &paths.materials {
            Some(materials) => scan_mtr(materials, Some(paths.textures.as_path()))
                .wrap_err("Cannot load mtr materials")?,
            None => MaterialDatabase::default(),
        };

        let sounds = SoundShaderDatabase::scan(&paths.sounds, Some(paths.sounds.as_path()))
            .wrap_err("Cannot load sound shaders")?;
        let catalog =
            MaterialCatalog::scan(&paths.materialsets).wrap_err("Cannot load material sets")?;

        Ok(Self {
            classes,
            materials,
            sounds,
            catalog,
        })
    }

    pub fn summary(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("classes", self.classes.len()),
            ("materials", self.materials.len()),
            ("sound shaders", self.sounds.len()),
            ("sound files", self.sounds.files.len()),
            ("material styles", self.catalog.len()),
        ]
    }
}

pub struct Session {
    pub vmf: VmfSession,
    pub t3d: T3dSession,
    pub map: MapSession,
}

impl Session {
    /// Engines share no state so they are loaded in parallel.
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let (vmf, (t3d, map)) = rayon::join(
            || VmfSession::load(&config.vmf).wrap_err_with(|| format!("Engine `{}`", Engine::Vmf)),
            || {
                rayon::join(
                    || {
                        T3dSession::load(&config.t3d)
                            .wrap_err_with(|| format!("Engine `{}`", Engine::T3d))
                    },
                    || {
                        MapSession::load(&config.map)
                            .wrap_err_with(|| format!("Engine `{}`", Engine::Map))
                    },
                )
            },
        );

        let res = Self {
            vmf: vmf?,
            t3d: t3d?,
            map: map?,
        };

        info!("Loaded every engine");

        Ok(res)
    }

    pub fn summary(&self, engine: Engine) -> Vec<(&'static str, usize)> {
        match engine {
            Engine::Vmf => self.vmf.summary(),
            Engine::T3d => self.t3d.summary(),
            Engine::Map => self.map.summary(),
        }
    }
}
