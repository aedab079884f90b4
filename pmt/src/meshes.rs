use std::path::Path;

use common::{unreal::UnrealAssetIndex, CommonError};
use log::info;

const ASSET_TYPE: &str = "Models";
/// Exported data mesh, converted to obj.
const EXTENSION: &str = "_d.3d.obj";

/// Meshes exported from UnrealEd as `PACKAGE/Models/[GROUP/]NAME_d.3d.obj`.
#[derive(Debug, Clone, Default)]
pub struct UnrealMeshDatabase {
    pub assets: UnrealAssetIndex,
}

impl UnrealMeshDatabase {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, CommonError> {
        let res = Self {
            assets: UnrealAssetIndex::scan(root, ASSET_TYPE, EXTENSION)?,
        };

        info!("Loaded {} unreal meshes", res.len());

        Ok(res)
    }

    /// Obj file of a mesh such as `UnrealShare.Chair`, ignoring case.
    pub fn obj_path(&self, unreal_path: &str) -> Option<&str> {
        self.assets.fs_path(unreal_path)
    }

    pub fn unreal_path(&self, obj_path: &str) -> Option<&str> {
        self.assets.unreal_path(obj_path)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &str> {
        self.assets.unreal_paths()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn meshes_by_package() {
        let dir = tempfile::tempdir().unwrap();
        let group = dir.path().join("Package/Models/Group");
        fs::create_dir_all(&group).unwrap();
        fs::write(group.join("Mesh_d.3d.obj"), "").unwrap();
        fs::write(group.join("Mesh_a.3d"), "").unwrap();

        let database = UnrealMeshDatabase::scan(dir.path()).unwrap();

        assert_eq!(database.len(), 1);
        assert_eq!(database.meshes().collect::<Vec<_>>(), vec!["package.group.mesh"]);

        let obj = database.obj_path("Package.Group.Mesh").unwrap();
        assert!(obj.ends_with("package/models/group/mesh_d.3d.obj"));
        assert_eq!(database.unreal_path(obj), Some("package.group.mesh"));
    }

    #[test]
    fn empty_root() {
        let dir = tempfile::tempdir().unwrap();

        assert!(UnrealMeshDatabase::scan(dir.path()).unwrap().is_empty());
        assert!(UnrealMeshDatabase::scan(dir.path().join("missing")).is_err());
    }
}
