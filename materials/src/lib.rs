//! Material to diffuse texture tables for Source `.vmt`, idTech4 `.mtr` and Unreal textures.
use std::collections::HashMap;

use common::path::normalize_path;
use log::warn;
use serde::Serialize;

mod error;
mod mtr;
mod textures;
mod unreal;
mod vmt;

pub use error::MaterialError;
pub use mtr::{parse_mtr, scan_mtr};
pub use textures::{TextureIndex, TextureInfo};
pub use unreal::UnrealTextureDatabase;
pub use vmt::{parse_vmt, scan_vmt, Vmt};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRecord {
    /// Normalized engine path, e.g. `dev/dev_floor` or `textures/base_wall/wall1`.
    pub material: String,
    /// Normalized texture path without extension.
    pub diffuse: String,
    pub surfaceprop: Option<String>,
}

/// Materials by name, and by the diffuse texture they use.
#[derive(Debug, Clone, Default)]
pub struct MaterialDatabase {
    records: Vec<MaterialRecord>,
    by_material: HashMap<String, usize>,
    by_diffuse: HashMap<String, Vec<usize>>,
    /// Converted images of the diffuse textures, if scanned.
    pub textures: Option<TextureIndex>,
}

impl MaterialDatabase {
    /// Adds a record unless its material is already known. Paths are normalized.
    pub fn insert(&mut self, mut record: MaterialRecord) -> bool {
        record.material = normalize_path(&record.material);
        record.diffuse = normalize_path(&record.diffuse);

        if self.by_material.contains_key(&record.material) {
            warn!("Material `{}` is defined more than once", record.material);
            return false;
        }

        let index = self.records.len();

        self.by_material.insert(record.material.clone(), index);
        self.by_diffuse
            .entry(record.diffuse.clone())
            .or_default()
            .push(index);
        self.records.push(record);

        true
    }

    pub fn get(&self, material: &str) -> Option<&MaterialRecord> {
        self.by_material
            .get(&normalize_path(material))
            .map(|&index| &self.records[index])
    }

    pub fn diffuse(&self, material: &str) -> Option<&str> {
        self.get(material).map(|record| record.diffuse.as_str())
    }

    /// Materials whose diffuse is `diffuse`, in scan order.
    pub fn materials_using(&self, diffuse: &str) -> impl Iterator<Item = &str> {
        self.by_diffuse
            .get(&normalize_path(diffuse))
            .into_iter()
            .flatten()
            .map(|&index| self.records[index].material.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.records.iter()
    }

    pub fn textures(&self) -> Option<&TextureIndex> {
        self.textures.as_ref()
    }

    /// Image of the diffuse texture of `material`.
    pub fn diffuse_texture(&self, material: &str) -> Option<&TextureInfo> {
        let diffuse = self.diffuse(material)?;

        self.textures.as_ref()?.get_texture(diffuse)
    }

    pub fn diffuse_dimensions(&self, material: &str) -> Option<(i64, i64)> {
        self.diffuse_texture(material)
            .map(|info| (info.width, info.height))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(material: &str, diffuse: &str) -> MaterialRecord {
        MaterialRecord {
            material: material.to_string(),
            diffuse: diffuse.to_string(),
            surfaceprop: None,
        }
    }

    #[test]
    fn keys_are_normalized() {
        let mut database = MaterialDatabase::default();

        assert!(database.insert(record("Dev\\Floor", "Dev\\Floor_Diffuse")));
        assert!(database.insert(record("dev/wall", "dev//floor_diffuse")));
        assert!(!database.insert(record("DEV/FLOOR", "other")));

        assert_eq!(database.len(), 2);
        assert_eq!(database.diffuse("dev\\floor"), Some("dev/floor_diffuse"));
        assert_eq!(
            database.materials_using("DEV/Floor_Diffuse").collect::<Vec<_>>(),
            vec!["dev/floor", "dev/wall"]
        );
        assert_eq!(database.materials_using("missing").count(), 0);
        assert_eq!(database.diffuse("missing"), None);
        assert_eq!(database.diffuse_dimensions("dev/floor"), None);
    }
}
