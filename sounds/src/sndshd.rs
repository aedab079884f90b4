use std::{collections::HashMap, path::Path};

use common::{
    files::{find_all_files, read_text},
    path::normalize_path,
    tokenizer::{check_depth, strip_block_comments, strip_line_comments, Lexed},
    KeyValues,
};
use log::{debug, info};
use serde::Serialize;

use crate::{error::SoundError, sound_files};

const TAGS: [&str; 8] = [
    "no_dups",
    "no_efx",
    "unclamped",
    "no_occlusion",
    "looping",
    "omnidirectional",
    "private",
    "global",
];

const PARAMS: [&str; 7] = [
    "mindistance",
    "maxdistance",
    "volume",
    "editor_displayfolder",
    "description",
    "shakes",
    "leadin",
];

const SOUND_EXTENSIONS: [&str; 2] = [".wav", ".ogg"];

const DISPLAY_FOLDER: &str = "editor_displayfolder";

/// One `name { ... }` block of a `.sndshd` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SoundShader {
    pub name: String,
    /// Flags without a value, lowercase, e.g. `looping`.
    pub tags: Vec<String>,
    /// Lowercase parameters with their lowercase value.
    pub params: KeyValues,
    /// Normalized sound paths in file order.
    pub sounds: Vec<String>,
}

impl SoundShader {
    /// `editor_displayfolder/name`, or just the name.
    pub fn display_path(&self) -> String {
        match self.params.get(DISPLAY_FOLDER) {
            Some(folder) if !folder.is_empty() => {
                format!("{}/{}", folder.trim_end_matches('/'), self.name)
            }
            _ => self.name.clone(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

fn is_sound_path(word: &str) -> bool {
    let lowercase = word.to_lowercase();

    SOUND_EXTENSIONS
        .iter()
        .any(|extension| lowercase.ends_with(extension))
}

/// Sound shaders of one `.sndshd` file, in file order.
pub fn parse_sndshd(text: &str) -> Result<Vec<SoundShader>, SoundError> {
    let text = strip_line_comments(text, &['"', '\'']);
    let text = strip_block_comments(&text);

    let lexed = Lexed::new(&text, &['"', '\''])?;
    let tokens = lexed.tokens("{}", false);

    check_depth(&tokens, "{", "}", 0, 1)?;

    let mut res = vec![];
    let mut name: Option<String> = None;
    let mut shader: Option<SoundShader> = None;

    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];
        index += 1;

        if token.is("{") {
            let Some(name) = name.take() else {
                return SoundError::ExpectedToken {
                    expected: "sound shader name",
                    index: index - 1,
                }
                .to_result();
            };

            shader = Some(SoundShader {
                name,
                ..Default::default()
            });

            continue;
        }

        if token.is("}") {
            res.extend(shader.take());
            continue;
        }

        let Some(text) = lexed.text(token) else {
            continue;
        };

        let Some(current) = shader.as_mut() else {
            name = Some(text.to_string());
            continue;
        };

        let lowercase = text.to_lowercase();

        if TAGS.contains(&lowercase.as_str()) {
            current.tags.push(lowercase);
        } else if PARAMS.contains(&lowercase.as_str()) {
            let value = tokens
                .get(index)
                .filter(|next| !next.is("{") && !next.is("}"))
                .and_then(|next| lexed.text(next));

            let Some(value) = value else {
                return SoundError::MissingValue {
                    name: current.name.clone(),
                    param: lowercase,
                }
                .to_result();
            };

            current.params.insert(lowercase, value.to_lowercase());
            index += 1;
        } else if is_sound_path(text) {
            current.sounds.push(normalize_path(text));
        } else {
            debug!("Unknown token `{text}` in sound shader `{}`", current.name);
        }
    }

    Ok(res)
}

/// Every sound shader below a root, with the reverse map from sound to shaders.
#[derive(Debug, Clone, Default)]
pub struct SoundShaderDatabase {
    shaders: Vec<SoundShader>,
    by_name: HashMap<String, usize>,
    by_sound: HashMap<String, Vec<usize>>,
    /// `.wav` and `.ogg` files on disk, relative to the sound root.
    pub files: Vec<String>,
}

impl SoundShaderDatabase {
    /// Reads every `.sndshd` below `sndshd_root` and lists the sound files below `sound_root`.
    pub fn scan(
        sndshd_root: impl AsRef<Path>,
        sound_root: Option<&Path>,
    ) -> Result<Self, SoundError> {
        let mut shaders = vec![];

        for (_, path) in find_all_files(sndshd_root, ".sndshd")? {
            let text = read_text(&path)?;
            let parsed = parse_sndshd(&text).map_err(|err| err.in_file(&path))?;

            shaders.extend(parsed);
        }

        let mut res = Self::from_shaders(shaders)?;

        if let Some(sound_root) = sound_root {
            res.files = sound_files(sound_root, &SOUND_EXTENSIONS)?;
        }

        info!(
            "Loaded {} sound shaders and {} sound files",
            res.len(),
            res.files.len()
        );

        Ok(res)
    }

    /// Fails on the second definition of a shader name, ignoring case.
    pub fn from_shaders(shaders: impl IntoIterator<Item = SoundShader>) -> Result<Self, SoundError> {
        let mut res = Self::default();

        for shader in shaders {
            let key = shader.name.to_lowercase();

            if res.by_name.contains_key(&key) {
                return SoundError::DuplicateShader { name: shader.name }.to_result();
            }

            let index = res.shaders.len();

            for sound in &shader.sounds {
                let users = res.by_sound.entry(sound.clone()).or_default();

                if !users.contains(&index) {
                    users.push(index);
                }
            }

            res.by_name.insert(key, index);
            res.shaders.push(shader);
        }

        Ok(res)
    }

    pub fn get(&self, name: &str) -> Option<&SoundShader> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&index| &self.shaders[index])
    }

    pub fn sounds(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(|shader| shader.sounds.as_slice())
    }

    /// Shaders playing `sound`, in scan order.
    pub fn shaders_using(&self, sound: &str) -> impl Iterator<Item = &SoundShader> {
        self.by_sound
            .get(&normalize_path(sound))
            .into_iter()
            .flatten()
            .map(|&index| &self.shaders[index])
    }

    pub fn shaders(&self) -> impl Iterator<Item = &SoundShader> {
        self.shaders.iter()
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    const SNDSHD: &str = r#"
// doors
doors_open
{
	minDistance	1
	maxDistance	25
	volume		-2
	editor_displayfolder "Doors/Mechanical"
	no_dups
	sound/doors/Door_Open1.wav
	sound/doors/door_open2.ogg	// second take
}

/* disabled
{
	sound/disabled.wav
} */

"ambient_wind" {
	looping
	omnidirectional
	shakes 0.5
	leadin
	"sound\ambient\wind.WAV"
	sound/doors/door_open1.wav
	frequencyshift
}
"#;

    #[test]
    fn shader_blocks() {
        let shaders = parse_sndshd(SNDSHD).unwrap();

        assert_eq!(shaders.len(), 2);

        let door = &shaders[0];
        assert_eq!(door.name, "doors_open");
        assert_eq!(door.tags, vec!["no_dups"]);
        assert_eq!(door.params.get("mindistance"), Some("1"));
        assert_eq!(door.params.get("volume"), Some("-2"));
        assert_eq!(door.display_path(), "doors/mechanical/doors_open");
        assert_eq!(
            door.sounds,
            vec!["sound/doors/door_open1.wav", "sound/doors/door_open2.ogg"]
        );

        let wind = &shaders[1];
        assert!(wind.has_tag("LOOPING"));
        assert!(wind.has_tag("omnidirectional"));
        assert_eq!(wind.params.get("shakes"), Some("0.5"));
        // `leadin` takes the next token as its value
        assert_eq!(wind.params.get("leadin"), Some("sound\\ambient\\wind.wav"));
        assert_eq!(wind.sounds, vec!["sound/doors/door_open1.wav"]);
        assert_eq!(wind.display_path(), "ambient_wind");
    }

    #[test]
    fn malformed_shaders() {
        assert!(parse_sndshd("a { { sound/a.wav } }").is_err());
        assert!(parse_sndshd("a { sound/a.wav").is_err());
        assert!(parse_sndshd("{ sound/a.wav }").is_err());
        assert!(matches!(
            parse_sndshd("a { volume }"),
            Err(SoundError::MissingValue { .. })
        ));
    }

    #[test]
    fn duplicates_and_reverse_map() {
        let shaders = parse_sndshd(SNDSHD).unwrap();
        let database = SoundShaderDatabase::from_shaders(shaders.clone()).unwrap();

        assert_eq!(
            database
                .shaders_using("Sound\\Doors\\door_open1.wav")
                .map(|shader| shader.name.as_str())
                .collect::<Vec<_>>(),
            vec!["doors_open", "ambient_wind"]
        );
        assert_eq!(database.sounds("DOORS_OPEN").map(<[String]>::len), Some(2));
        assert!(database.get("missing").is_none());

        let mut twice = shaders.clone();
        twice.push(SoundShader {
            name: "Doors_Open".to_string(),
            ..Default::default()
        });

        assert!(matches!(
            SoundShaderDatabase::from_shaders(twice),
            Err(SoundError::DuplicateShader { .. })
        ));
    }

    #[test]
    fn scan_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sounds = dir.path().join("sound/doors");
        fs::create_dir_all(&sounds).unwrap();
        fs::create_dir_all(dir.path().join("sound/shaders")).unwrap();
        fs::write(sounds.join("door_open1.wav"), "").unwrap();
        fs::write(dir.path().join("sound/shaders/doors.sndshd"), SNDSHD).unwrap();
        fs::write(
            dir.path().join("sound/shaders/zz_broken.sndshd"),
            "broken { sound/a.wav",
        )
        .unwrap();

        assert!(matches!(
            SoundShaderDatabase::scan(dir.path().join("sound/shaders"), None),
            Err(SoundError::InFile { .. })
        ));

        fs::remove_file(dir.path().join("sound/shaders/zz_broken.sndshd")).unwrap();

        let database =
            SoundShaderDatabase::scan(dir.path().join("sound/shaders"), Some(dir.path())).unwrap();

        assert_eq!(database.len(), 2);
        assert_eq!(database.files, vec!["sound/doors/door_open1.wav"]);
    }
}
