use std::path::Path;

use common::{unreal::UnrealAssetIndex, CommonError};
use log::info;

use crate::{TextureIndex, TextureInfo};

const ASSET_TYPE: &str = "Textures";
const EXTENSION: &str = ".bmp";

/// Textures exported from UnrealEd as `PACKAGE/Textures/[GROUP/]NAME.bmp`.
#[derive(Debug, Clone, Default)]
pub struct UnrealTextureDatabase {
    pub assets: UnrealAssetIndex,
    pub textures: TextureIndex,
}

impl UnrealTextureDatabase {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, CommonError> {
        let root = root.as_ref();

        let res = Self {
            assets: UnrealAssetIndex::scan(root, ASSET_TYPE, EXTENSION)?,
            textures: TextureIndex::scan(root, EXTENSION)?,
        };

        info!("Loaded {} unreal textures", res.assets.len());

        Ok(res)
    }

    /// `package.group.name` to normalized filesystem path.
    pub fn fs_path(&self, unreal_path: &str) -> Option<&str> {
        self.assets.fs_path(unreal_path)
    }

    pub fn unreal_path(&self, fs_path: &str) -> Option<&str> {
        self.assets.unreal_path(fs_path)
    }

    pub fn texture(&self, unreal_path: &str) -> Option<&TextureInfo> {
        self.textures.get(self.fs_path(unreal_path)?)
    }

    pub fn dimensions(&self, unreal_path: &str) -> Option<(i64, i64)> {
        self.texture(unreal_path)
            .map(|info| (info.width, info.height))
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
