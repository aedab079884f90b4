//! Converted texture images on disk, with their size and json side files.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use common::{
    files::find_all_files,
    image::dimensions,
    metadata::{load_metadata, Metadata, MetadataKind},
    path::{normalize_fs_path, normalize_path, relative_key, strip_suffix_ignore_case},
    CommonError,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureInfo {
    /// Normalized absolute path.
    pub fs_path: String,
    pub width: i64,
    pub height: i64,
    pub analyze: Metadata,
    pub tags: Metadata,
}

/// Every image with `extension` below `root`, keyed by normalized filesystem path.
#[derive(Debug, Clone, Default)]
pub struct TextureIndex {
    root: PathBuf,
    extension: String,
    textures: HashMap<String, TextureInfo>,
    files: Vec<String>,
}

impl TextureIndex {
    pub fn scan(root: impl AsRef<Path>, extension: &str) -> Result<Self, CommonError> {
        let root = root.as_ref();

        let mut res = Self {
            root: root.to_path_buf(),
            extension: extension.to_lowercase(),
            ..Default::default()
        };

        for (_, path) in find_all_files(root, extension)? {
            let (width, height) = dimensions(&path)?;
            let fs_path = normalize_fs_path(&path);

            let info = TextureInfo {
                fs_path: fs_path.clone(),
                width,
                height,
                analyze: load_metadata(&path, MetadataKind::Analyze)?,
                tags: load_metadata(&path, MetadataKind::Tags)?,
            };

            res.textures.insert(fs_path.clone(), info);
            res.files.push(fs_path);
        }

        Ok(res)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, fs_path: &str) -> Option<&TextureInfo> {
        self.textures.get(&normalize_path(fs_path))
    }

    pub fn dimensions(&self, fs_path: &str) -> Option<(i64, i64)> {
        self.get(fs_path).map(|info| (info.width, info.height))
    }

    /// Image of an engine texture path such as `dev/floor` or `textures/base/wall`.
    pub fn get_texture(&self, texture_path: &str) -> Option<&TextureInfo> {
        self.get(&self.to_fs_path(texture_path))
    }

    /// `dev/floor` to `<root>/dev/floor.png`, normalized.
    pub fn to_fs_path(&self, texture_path: &str) -> String {
        let root = normalize_fs_path(&self.root);

        format!(
            "{}/{}{}",
            root.trim_end_matches('/'),
            normalize_path(texture_path).trim_start_matches('/'),
            self.extension
        )
    }

    /// `<root>/dev/floor.png` to `dev/floor`.
    pub fn to_texture_path(&self, fs_path: &str) -> String {
        let relative = relative_key(fs_path, &self.root.to_string_lossy());

        strip_suffix_ignore_case(&relative, &self.extension)
            .unwrap_or(&relative)
            .to_string()
    }

    /// Textures in path order.
    pub fn iter(&self) -> impl Iterator<Item = &TextureInfo> {
        self.files
            .iter()
            .filter_map(|fs_path| self.textures.get(fs_path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::fs;

    use super::*;

    pub(crate) fn png_header(width: i32, height: i32) -> Vec<u8> {
        let mut bytes = vec![137, 80, 78, 71, 13, 10, 26, 10];
        bytes.extend(13u32.to_be_bytes());
        bytes.extend(b"IHDR");
        bytes.extend(width.to_be_bytes());
        bytes.extend(height.to_be_bytes());
        bytes
    }

    #[test]
    fn scan_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Dev")).unwrap();
        fs::write(dir.path().join("Dev/Floor.png"), png_header(256, 128)).unwrap();
        fs::write(dir.path().join("Dev/Floor.png.tags.txt"), r#"{"tags": ["floor"]}"#).unwrap();
        fs::write(dir.path().join("Dev/Wall.png"), png_header(64, 64)).unwrap();
        fs::write(dir.path().join("Dev/readme.txt"), "").unwrap();

        let index = TextureIndex::scan(dir.path(), ".png").unwrap();

        assert_eq!(index.len(), 2);

        let fs_path = index.to_fs_path("DEV/floor");
        assert!(fs_path.ends_with("/dev/floor.png"));
        assert_eq!(index.to_texture_path(&fs_path), "dev/floor");
        assert_eq!(index.dimensions(&fs_path), Some((256, 128)));

        let floor = index.get_texture("dev/floor").unwrap();
        assert_eq!(floor.tags["tags"][0], "floor");
        assert!(floor.analyze.is_empty());

        assert_eq!(index.get_texture("dev/missing"), None);
        assert_eq!(
            index.iter().map(|info| info.width).collect::<Vec<_>>(),
            vec![256, 64]
        );
    }

    #[test]
    fn broken_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.png"), "not a png").unwrap();

        assert!(matches!(
            TextureIndex::scan(dir.path(), ".png"),
            Err(CommonError::ImageHeader { .. })
        ));
    }
}
