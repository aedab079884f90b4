//! Material lists grouped by style and category, read from `<style>/.../<category>.matlist.txt`.
use std::{collections::BTreeMap, path::Path};

use common::{
    files::{find_all_files, read_text},
    path::{normalize_fs_path, relative_key, strip_suffix_ignore_case},
    CommonError,
};
use log::{debug, info};

const EXTENSION: &str = ".matlist.txt";

#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    /// style -> category -> materials in file order. Keys are lowercase.
    pub styles: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// One material per line. Lines without a letter or digit are skipped.
fn parse_matlist(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.chars().any(char::is_alphanumeric))
}

impl MaterialCatalog {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, CommonError> {
        let root = root.as_ref();
        let root_key = normalize_fs_path(root);

        let mut res = Self::default();

        for (_, path) in find_all_files(root, EXTENSION)? {
            let relative = relative_key(&normalize_fs_path(&path), &root_key);

            let Some((style, file)) = relative.split_once('/') else {
                debug!("`{relative}` is not inside a style folder");
                continue;
            };

            let file_name = file.rsplit('/').next().unwrap_or(file);
            let category = strip_suffix_ignore_case(file_name, EXTENSION).unwrap_or(file_name);

            let text = read_text(&path)?;

            res.styles
                .entry(style.to_string())
                .or_default()
                .entry(category.to_string())
                .or_default()
                .extend(parse_matlist(&text).map(str::to_string));
        }

        info!("Loaded {} material styles", res.styles.len());

        Ok(res)
    }

    pub fn materials(&self, style: &str, category: &str) -> Option<&[String]> {
        self.styles
            .get(&style.to_lowercase())?
            .get(&category.to_lowercase())
            .map(Vec::as_slice)
    }

    /// Picks a material of the category. The same cluster always gets the same material.
    pub fn select(&self, style: &str, category: &str, cluster: i64) -> Option<&str> {
        let materials = self.materials(style, category)?;

        if materials.is_empty() {
            return None;
        }

        let index = cluster.rem_euclid(materials.len() as i64) as usize;

        materials.get(index).map(String::as_str)
    }

    pub fn style_names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn categories(&self, style: &str) -> impl Iterator<Item = &str> {
        self.styles
            .get(&style.to_lowercase())
            .into_iter()
            .flat_map(|categories| categories.keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    fn catalog() -> (tempfile::TempDir, MaterialCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let style = dir.path().join("Industrial/walls");
        fs::create_dir_all(&style).unwrap();

        fs::write(
            style.join("Concrete.matlist.txt"),
            "concrete/wall01\n\n----\nconcrete/wall02\r\n  concrete/wall03  \n",
        )
        .unwrap();
        fs::write(dir.path().join("Industrial/floor.matlist.txt"), "tile/floor01\n").unwrap();
        fs::write(dir.path().join("loose.matlist.txt"), "tile/loose\n").unwrap();
        fs::write(dir.path().join("Industrial/readme.txt"), "nothing").unwrap();

        let catalog = MaterialCatalog::scan(dir.path()).unwrap();

        (dir, catalog)
    }

    #[test]
    fn styles_and_categories() {
        let (_dir, catalog) = catalog();

        assert_eq!(catalog.style_names().collect::<Vec<_>>(), vec!["industrial"]);
        assert_eq!(
            catalog.categories("Industrial").collect::<Vec<_>>(),
            vec!["concrete", "floor"]
        );
        assert_eq!(
            catalog.materials("industrial", "CONCRETE").unwrap(),
            ["concrete/wall01", "concrete/wall02", "concrete/wall03"]
        );
        assert_eq!(catalog.categories("medieval").count(), 0);
    }

    #[test]
    fn selection_is_stable() {
        let (_dir, catalog) = catalog();

        assert_eq!(
            catalog.select("industrial", "concrete", 4),
            Some("concrete/wall02")
        );
        assert_eq!(
            catalog.select("industrial", "concrete", -1),
            Some("concrete/wall03")
        );
        assert_eq!(
            catalog.select("industrial", "concrete", 7),
            catalog.select("industrial", "concrete", 7)
        );
        assert_eq!(catalog.select("industrial", "glass", 0), None);
    }
}
