use std::path::Path;

use common::{unreal::UnrealAssetIndex, CommonError};
use log::info;

const ASSET_TYPE: &str = "Sounds";
const EXTENSION: &str = ".wav";

/// Sounds exported from UnrealEd as `PACKAGE/Sounds/[GROUP/]NAME.wav`.
#[derive(Debug, Clone, Default)]
pub struct UnrealSoundDatabase {
    pub assets: UnrealAssetIndex,
}

impl UnrealSoundDatabase {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, CommonError> {
        let res = Self {
            assets: UnrealAssetIndex::scan(root, ASSET_TYPE, EXTENSION)?,
        };

        info!("Loaded {} unreal sounds", res.len());

        Ok(res)
    }

    pub fn fs_path(&self, unreal_path: &str) -> Option<&str> {
        self.assets.fs_path(unreal_path)
    }

    pub fn unreal_path(&self, fs_path: &str) -> Option<&str> {
        self.assets.unreal_path(fs_path)
    }

    pub fn unreal_paths(&self) -> impl Iterator<Item = &str> {
        self.assets.unreal_paths()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
