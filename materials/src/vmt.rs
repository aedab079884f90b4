use std::path::Path;

use common::{
    files::{find_all_files, read_text},
    path::{normalize_path, relative_key, strip_extension, strip_suffix_ignore_case},
    tokenizer::{strip_line_comments, Lexed, Token},
};
use log::{debug, info};

use crate::{error::MaterialError, MaterialDatabase, MaterialRecord, TextureIndex};

const BASETEXTURE: &str = "$basetexture";
const SURFACEPROP: &str = "$surfaceprop";
const STRIPPED_EXTENSIONS: [&str; 2] = [".vtf", ".tga"];

/// Folders of map specific prop materials, which duplicate other materials.
const MAP_SPECIFIC_PREFIX: &str = "_msp";

/// Keys of a `.vmt` used for export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vmt {
    pub basetexture: Option<String>,
    pub surfaceprop: Option<String>,
}

/// First `$basetexture` and first `$surfaceprop` of a material.
///
/// Later occurrences belong to fallback shaders and are ignored.
pub fn parse_vmt(text: &str) -> Result<Vmt, MaterialError> {
    let lexed = Lexed::new(&strip_line_comments(text, &['"']), &['"'])?;
    let tokens = lexed.tokens("{}", true);

    let mut res = Vmt::default();

    let pairs = tokens.split(Token::is_newline).flat_map(|line| {
        let words: Vec<&str> = line
            .iter()
            .filter(|token| !token.is("{") && !token.is("}"))
            .filter_map(|token| lexed.text(token))
            .collect();

        words
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .collect::<Vec<_>>()
    });

    for (key, value) in pairs {
        let slot = if key.eq_ignore_ascii_case(BASETEXTURE) {
            &mut res.basetexture
        } else if key.eq_ignore_ascii_case(SURFACEPROP) {
            &mut res.surfaceprop
        } else {
            continue;
        };

        if slot.is_none() {
            *slot = Some(value.to_string());
        }

        if res.basetexture.is_some() && res.surfaceprop.is_some() {
            break;
        }
    }

    Ok(res)
}

/// Normalized `$basetexture` without its image extension.
fn diffuse_path(basetexture: &str) -> String {
    let path = normalize_path(basetexture);

    STRIPPED_EXTENSIONS
        .iter()
        .find_map(|extension| strip_suffix_ignore_case(&path, extension))
        .unwrap_or(&path)
        .to_string()
}

fn is_map_specific(material: &str) -> bool {
    let folders: Vec<&str> = material.split('/').collect();

    folders[..folders.len().saturating_sub(1)]
        .iter()
        .take(2)
        .any(|folder| folder.starts_with(MAP_SPECIFIC_PREFIX))
}

/// Reads every `.vmt` below `materials_root`. Images under `textures_root` are indexed if given.
pub fn scan_vmt(
    materials_root: impl AsRef<Path>,
    textures_root: Option<&Path>,
) -> Result<MaterialDatabase, MaterialError> {
    let materials_root = materials_root.as_ref();
    let root_key = materials_root.to_string_lossy();

    let mut res = MaterialDatabase::default();

    for (_, path) in find_all_files(materials_root, ".vmt")? {
        let relative = relative_key(&path.to_string_lossy(), &root_key);
        let material = strip_extension(&relative).to_string();

        if is_map_specific(&material) {
            debug!("Skipping map specific material `{material}`");
            continue;
        }

        let vmt = parse_vmt(&read_text(&path)?).map_err(|err| err.in_file(&path))?;

        let Some(basetexture) = vmt.basetexture else {
            debug!("Material `{material}` has no {BASETEXTURE}");
            continue;
        };

        res.insert(MaterialRecord {
            material,
            diffuse: diffuse_path(&basetexture),
            surfaceprop: vmt.surfaceprop,
        });
    }

    if let Some(textures_root) = textures_root {
        res.textures = Some(TextureIndex::scan(textures_root, ".png")?);
    }

    info!("Loaded {} vmt materials", res.len());

    Ok(res)
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::textures::test::png_header;

    #[test]
    fn first_keys_win() {
        let vmt = parse_vmt(
            r#""LightmappedGeneric"
{
	// "$basetexture" "commented/out"
	"$basetexture" "Dev\Dev_Floor"
	"$basetexturetransform" "center .5 .5"
	$surfaceprop metal
	"LightmappedGeneric_DX6"
	{
		"$basetexture" "dev/fallback"
		"$surfaceprop" "wood"
	}
}"#,
        )
        .unwrap();

        assert_eq!(vmt.basetexture.as_deref(), Some("Dev\\Dev_Floor"));
        assert_eq!(vmt.surfaceprop.as_deref(), Some("metal"));
    }

    #[test]
    fn scenario_basetexture_and_surfaceprop() {
        let vmt = parse_vmt("\"$basetexture\" \"dir/tex\"\n\"$surfaceprop\" \"metal\"").unwrap();

        assert_eq!(
            vmt,
            Vmt {
                basetexture: Some("dir/tex".to_string()),
                surfaceprop: Some("metal".to_string()),
            }
        );
        assert_eq!(parse_vmt("\"$surfaceprop\" \"metal\"").unwrap().basetexture, None);
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let vmt = parse_vmt("\"VertexLitGeneric\" { \"$basetexture\" \"dev/dev measure\" }").unwrap();

        assert_eq!(vmt.basetexture.as_deref(), Some("dev/dev measure"));
        assert!(parse_vmt("\"$basetexture\" \"dev/open").is_err());
    }

    #[test]
    fn diffuse_without_extension() {
        assert_eq!(diffuse_path("Brick\\Wall01.VTF"), "brick/wall01");
        assert_eq!(diffuse_path("brick/wall01.tga"), "brick/wall01");
        assert_eq!(diffuse_path("brick/wall01"), "brick/wall01");

        let materials = tempfile::tempdir().unwrap();
        fs::write(
            materials.path().join("wall.vmt"),
            "\"$basetexture\" \"brick/wall01.vtf\"",
        )
        .unwrap();
        fs::write(
            materials.path().join("wall_wet.vmt"),
            "\"$basetexture\" \"brick/wall01\"",
        )
        .unwrap();

        let database = scan_vmt(materials.path(), None).unwrap();

        assert_eq!(database.diffuse("wall"), Some("brick/wall01"));
        assert_eq!(
            database.materials_using("brick/wall01").collect::<Vec<_>>(),
            vec!["wall", "wall_wet"]
        );
    }

    #[test]
    fn map_specific_folders() {
        assert!(is_map_specific("_msp/a/b"));
        assert!(is_map_specific("props/_msp_map1/b"));
        assert!(!is_map_specific("props/sub/_msp/b"));
        assert!(!is_map_specific("_msp_material"));
    }

    #[test]
    fn scan_directory() {
        let materials = tempfile::tempdir().unwrap();
        let textures = tempfile::tempdir().unwrap();

        fs::create_dir_all(materials.path().join("Dev")).unwrap();
        fs::create_dir_all(materials.path().join("_msp")).unwrap();
        fs::write(
            materials.path().join("Dev/Floor.vmt"),
            "\"$basetexture\" \"Dev\\Floor\"\n\"$surfaceprop\" \"concrete\"",
        )
        .unwrap();
        fs::write(materials.path().join("Dev/Floor_Wet.vmt"), "\"$basetexture\" \"dev/floor\"").unwrap();
        fs::write(materials.path().join("Dev/NoDraw.vmt"), "\"$translucent\" 1").unwrap();
        fs::write(materials.path().join("_msp/Floor.vmt"), "\"$basetexture\" \"dev/floor\"").unwrap();

        fs::create_dir_all(textures.path().join("dev")).unwrap();
        fs::write(textures.path().join("dev/floor.png"), png_header(512, 256)).unwrap();

        let database = scan_vmt(materials.path(), Some(textures.path())).unwrap();

        assert_eq!(database.len(), 2);
        assert_eq!(database.diffuse("DEV/FLOOR"), Some("dev/floor"));
        assert_eq!(
            database.get("dev/floor").unwrap().surfaceprop.as_deref(),
            Some("concrete")
        );
        assert_eq!(database.get("dev/floor_wet").unwrap().surfaceprop, None);
        assert!(database.get("dev/nodraw").is_none());
        assert!(database.get("_msp/floor").is_none());
        assert_eq!(
            database.materials_using("dev/floor").collect::<Vec<_>>(),
            vec!["dev/floor", "dev/floor_wet"]
        );
        assert_eq!(database.diffuse_dimensions("dev/floor_wet"), Some((512, 256)));
    }
}
