use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    error::CommonError,
    files::find_all_files,
    path::{normalize_fs_path, normalize_path, to_unreal_path},
};

/// Exported Unreal assets on disk, indexed by unreal path and by filesystem path.
///
/// Assets are laid out as `root/PACKAGE/<asset type>/[GROUP/]NAME<suffix>`.
#[derive(Debug, Clone, Default)]
pub struct UnrealAssetIndex {
    pub root: PathBuf,
    unreal_to_fs: HashMap<String, String>,
    fs_to_unreal: HashMap<String, String>,
    /// Normalized filesystem paths in scan order.
    pub files: Vec<String>,
}

impl UnrealAssetIndex {
    pub fn scan(
        root: impl AsRef<Path>,
        asset_type: &str,
        suffix: &str,
    ) -> Result<Self, CommonError> {
        let root = root.as_ref();
        let root_key = normalize_fs_path(root);

        let mut res = Self {
            root: root.to_path_buf(),
            ..Default::default()
        };

        for (_, path) in find_all_files(root, suffix)? {
            let fs_path = normalize_fs_path(&path);
            let unreal_path = to_unreal_path(&fs_path, &root_key, asset_type, suffix)?;

            debug!("{fs_path} -> {unreal_path}");

            res.unreal_to_fs.insert(unreal_path.clone(), fs_path.clone());
            res.fs_to_unreal.insert(fs_path.clone(), unreal_path);
            res.files.push(fs_path);
        }

        Ok(res)
    }

    pub fn fs_path(&self, unreal_path: &str) -> Option<&str> {
        self.unreal_to_fs
            .get(&unreal_path.to_lowercase())
            .map(String::as_str)
    }

    pub fn unreal_path(&self, fs_path: &str) -> Option<&str> {
        self.fs_to_unreal
            .get(&normalize_path(fs_path))
            .map(String::as_str)
    }

    pub fn unreal_paths(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter_map(|fs_path| self.fs_to_unreal.get(fs_path))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn index_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("UnrealShare").join("Models");
        fs::create_dir_all(models.join("Deco")).unwrap();

        fs::write(models.join("Chair_d.3d.obj"), "").unwrap();
        fs::write(models.join("Deco").join("Vase_d.3d.obj"), "").unwrap();
        fs::write(models.join("Chair_a.3d"), "").unwrap();

        let index = UnrealAssetIndex::scan(dir.path(), "Models", "_d.3d.obj").unwrap();

        assert_eq!(index.len(), 2);

        let chair = index.fs_path("UnrealShare.Chair").unwrap().to_string();

        assert!(chair.ends_with("unrealshare/models/chair_d.3d.obj"));
        assert_eq!(index.unreal_path(&chair), Some("unrealshare.chair"));
        assert!(index.fs_path("unrealshare.deco.vase").is_some());
        assert_eq!(index.fs_path("unrealshare.missing"), None);
        assert_eq!(
            index.unreal_paths().collect::<Vec<_>>(),
            vec!["unrealshare.chair", "unrealshare.deco.vase"]
        );
    }

    #[test]
    fn asset_outside_type_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("Pkg");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("loose.wav"), "").unwrap();

        assert!(matches!(
            UnrealAssetIndex::scan(dir.path(), "Sounds", ".wav"),
            Err(CommonError::MissingAssetFolder { .. })
        ));
    }
}
