use std::path::Path;

use common::{
    files::{find_all_files, read_text},
    path::{normalize_path, strip_suffix_ignore_case},
    tokenizer::{check_depth, get_token, strip_block_comments, strip_line_comments, Lexed, Token},
};
use log::{debug, info};

use crate::{error::MaterialError, MaterialDatabase, MaterialRecord, TextureIndex};

const MATERIAL_PREFIX: &str = "textures/";
const STRIPPED_EXTENSIONS: [&str; 3] = [".tga", ".jpg", ".dds"];

/// Texture candidates of one material block.
#[derive(Debug, Default)]
struct Candidates {
    diffusemap: Option<String>,
    blend_diffusemap: Option<String>,
    qer_editorimage: Option<String>,
}

impl Candidates {
    /// `diffusemap` over `blend diffusemap` over `qer_editorimage`.
    ///
    /// Paths without `/`, such as `_white`, are engine images and never chosen
    /// as diffuse.
    fn diffuse(self) -> Option<String> {
        let is_texture = |path: &String| path.contains('/');

        let path = self
            .diffusemap
            .filter(is_texture)
            .or(self.blend_diffusemap.filter(is_texture))
            .or(self.qer_editorimage)?;

        let path = normalize_path(&path);

        let stripped = STRIPPED_EXTENSIONS
            .iter()
            .find_map(|extension| strip_suffix_ignore_case(&path, extension))
            .unwrap_or(&path);

        Some(stripped.to_string())
    }
}

/// Stage of a material, the `{ ... }` inside the material block.
#[derive(Debug, Default)]
struct Stage {
    is_diffuse: bool,
    map: Option<String>,
}

fn word_after<'a>(lexed: &'a Lexed, tokens: &'a [Token], index: usize) -> Option<&'a str> {
    let token = tokens.get(index + 1)?;

    if token.is_newline() || token.is("{") || token.is("}") {
        return None;
    }

    lexed.text(token)
}

/// Material to diffuse texture pairs of one `.mtr` file, in file order.
///
/// Only blocks named `textures/...` at the top level are materials.
pub fn parse_mtr(text: &str) -> Result<Vec<(String, String)>, MaterialError> {
    let text = strip_line_comments(text, &['"']);
    let text = strip_block_comments(&text);

    let lexed = Lexed::new(&text, &['"'])?;
    let tokens = lexed.tokens("{}", true);

    check_depth(&tokens, "{", "}", 0, i64::MAX)?;

    let mut res = vec![];
    let mut depth = 0usize;
    let mut material: Option<(String, Candidates)> = None;
    let mut stage = Stage::default();

    for (index, token) in tokens.iter().enumerate() {
        if token.is("{") {
            depth += 1;

            if depth == 2 {
                stage = Stage::default();
            }

            continue;
        }

        if token.is("}") {
            depth = depth.saturating_sub(1);

            if depth == 1 {
                if let (Some((_, candidates)), true) = (material.as_mut(), stage.is_diffuse) {
                    if let Some(map) = stage.map.take() {
                        candidates.blend_diffusemap = Some(map);
                    }
                }
            }

            if depth == 0 {
                if let Some((name, candidates)) = material.take() {
                    match candidates.diffuse() {
                        Some(diffuse) => res.push((normalize_path(&name), diffuse)),
                        None => debug!("Material `{name}` has no diffuse texture"),
                    }
                }
            }

            continue;
        }

        let Some(word) = token.word() else {
            continue;
        };

        match (depth, material.as_mut()) {
            (0, None) => {
                let opens_block = get_token(&tokens, index, 1).is_some_and(|(_, next)| next.is("{"));

                if opens_block && word.to_lowercase().starts_with(MATERIAL_PREFIX) {
                    material = Some((word.to_string(), Candidates::default()));
                }
            }
            (1, Some((_, candidates))) => {
                if word.eq_ignore_ascii_case("diffusemap") {
                    candidates.diffusemap = word_after(&lexed, &tokens, index).map(str::to_string);
                } else if word.eq_ignore_ascii_case("qer_editorimage") {
                    candidates.qer_editorimage =
                        word_after(&lexed, &tokens, index).map(str::to_string);
                }
            }
            (2, Some(_)) => {
                if word.eq_ignore_ascii_case("blend") {
                    stage.is_diffuse = word_after(&lexed, &tokens, index)
                        .is_some_and(|next| next.eq_ignore_ascii_case("diffusemap"));
                } else if word.eq_ignore_ascii_case("map") {
                    stage.map = word_after(&lexed, &tokens, index).map(str::to_string);
                }
            }
            _ => (),
        }
    }

    Ok(res)
}

/// Reads every `.mtr` below `materials_root`. The first definition of a material wins.
pub fn scan_mtr(
    materials_root: impl AsRef<Path>,
    textures_root: Option<&Path>,
) -> Result<MaterialDatabase, MaterialError> {
    let mut res = MaterialDatabase::default();

    for (_, path) in find_all_files(materials_root, ".mtr")? {
        let text = read_text(&path)?;
        let pairs = parse_mtr(&text).map_err(|err| err.in_file(&path))?;

        for (material, diffuse) in pairs {
            res.insert(MaterialRecord {
                material,
                diffuse,
                surfaceprop: None,
            });
        }
    }

    if let Some(textures_root) = textures_root {
        res.textures = Some(TextureIndex::scan(textures_root, ".png")?);
    }

    info!("Loaded {} mtr materials", res.len());

    Ok(res)
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    const MTR: &str = r#"
table sinTable { { 0, 0.5, 1 } }

textures/base_wall/lfwall27d
{
	qer_editorimage	textures/base_wall/lfwall27d_ed.tga
	{
		blend diffusemap
		map textures/base_wall/lfwall27d_blend.tga
	}
	diffusemap		textures/base_wall/lfwall27d.TGA // trailing
	bumpmap			textures/base_wall/lfwall27d_local
}

textures/Common/NoDraw
{
	qer_editorimage textures/common/nodraw.tga
	diffusemap _white
}

/* textures/commented/out
{
	diffusemap textures/commented/out
} */

textures/decals/blood {
	{
		map textures/decals/blood_stage
		blend diffusemap
	}
	{
		blend add
		map textures/decals/glow
	}
}

textures/empty/material
{
	diffusemap _black
}

particles/smoke
{
	diffusemap textures/particles/smoke
}
"#;

    #[test]
    fn diffuse_precedence() {
        let pairs = parse_mtr(MTR).unwrap();

        assert_eq!(
            pairs,
            vec![
                (
                    "textures/base_wall/lfwall27d".to_string(),
                    "textures/base_wall/lfwall27d".to_string()
                ),
                (
                    "textures/common/nodraw".to_string(),
                    "textures/common/nodraw".to_string()
                ),
                (
                    "textures/decals/blood".to_string(),
                    "textures/decals/blood_stage".to_string()
                ),
            ]
        );
    }

    #[test]
    fn unbalanced_blocks() {
        assert!(parse_mtr("textures/a { diffusemap textures/a").is_err());
        assert!(parse_mtr("textures/a } {").is_err());
    }

    #[test]
    fn first_definition_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.mtr"),
            "textures/x/one { diffusemap textures/x/first }",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.mtr"),
            "textures/x/one { diffusemap textures/x/second }\ntextures/x/two { diffusemap textures/x/first }",
        )
        .unwrap();

        let database = scan_mtr(dir.path(), None).unwrap();

        assert_eq!(database.len(), 2);
        assert_eq!(database.diffuse("textures/x/one"), Some("textures/x/first"));
        assert_eq!(
            database.materials_using("TEXTURES/X/FIRST").collect::<Vec<_>>(),
            vec!["textures/x/one", "textures/x/two"]
        );
        assert!(database.textures().is_none());
    }
}
