//! Source `scripts/*.txt` soundscripts and soundscapes, found through their manifests.
use std::{collections::HashMap, path::Path};

use common::{
    files::read_text,
    path::normalize_path,
    tokenizer::{check_depth, strip_line_comments, Lexed, Token},
};
use log::{debug, info};
use serde::Serialize;

use crate::{error::SoundError, sound_files};

const KEYVALUE_KEYS: [&str; 14] = [
    "channel",
    "volume",
    "pitch",
    "soundlevel",
    "dsp",
    "dsp_volume",
    "wave",
    "attenuation",
    "time",
    "position",
    "positionoverride",
    "name",
    "soundmixer",
    "suppress_on_restore",
];

const WAVE: &str = "wave";

const MAX_DEPTH: i64 = 3;

const SOUNDSCRIPTS_MANIFEST: &str = "scripts/game_sounds_manifest.txt";
const SOUNDSCAPES_MANIFEST: &str = "scripts/soundscapes_manifest.txt";
const MANIFEST_ENTRIES: [&str; 2] = ["file", "precache_file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    RndWave,
    PlayRandom,
    PlayLooping,
    PlaySoundscape,
}

impl BlockKind {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "rndwave" => Some(Self::RndWave),
            "playrandom" => Some(Self::PlayRandom),
            "playlooping" => Some(Self::PlayLooping),
            "playsoundscape" => Some(Self::PlaySoundscape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SoundEntry {
    /// Lowercase key with the value as written.
    KeyValue(String, String),
    Block(BlockKind, SoundBlock),
}

/// Contents of a `{ ... }`, in file order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SoundBlock {
    pub entries: Vec<SoundEntry>,
}

impl SoundBlock {
    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            SoundEntry::KeyValue(k, v) if k.eq_ignore_ascii_case(key) => Some(v.as_str()),
            _ => None,
        })
    }

    /// Normalized `wave` paths directly in this block.
    pub fn waves(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            SoundEntry::KeyValue(k, v) if k == WAVE => Some(normalize_path(v)),
            _ => None,
        })
    }

    pub fn blocks(&self, kind: BlockKind) -> impl Iterator<Item = &SoundBlock> {
        self.entries.iter().filter_map(move |entry| match entry {
            SoundEntry::Block(k, block) if *k == kind => Some(block),
            _ => None,
        })
    }
}

fn parse_block(
    lexed: &Lexed,
    tokens: &[Token],
    open: usize,
    name: &str,
) -> Result<(SoundBlock, usize), SoundError> {
    let mut block = SoundBlock::default();
    let mut index = open + 1;

    loop {
        let Some(token) = tokens.get(index) else {
            return SoundError::ExpectedToken {
                expected: "}",
                index,
            }
            .to_result();
        };

        if token.is("}") {
            return Ok((block, index));
        }

        let Some(key) = lexed.text(token).map(str::to_lowercase) else {
            return SoundError::ExpectedToken {
                expected: "key",
                index,
            }
            .to_result();
        };

        if KEYVALUE_KEYS.contains(&key.as_str()) {
            let value = tokens
                .get(index + 1)
                .filter(|next| !next.is("{") && !next.is("}"))
                .and_then(|next| lexed.text(next));

            let Some(value) = value else {
                return SoundError::ExpectedToken {
                    expected: "value",
                    index: index + 1,
                }
                .to_result();
            };

            block.entries.push(SoundEntry::KeyValue(key, value.to_string()));
            index += 2;
        } else if let Some(kind) = BlockKind::from_key(&key) {
            if !tokens.get(index + 1).is_some_and(|next| next.is("{")) {
                return SoundError::ExpectedToken {
                    expected: "{",
                    index: index + 1,
                }
                .to_result();
            }

            let (child, close) = parse_block(lexed, tokens, index + 1, name)?;

            block.entries.push(SoundEntry::Block(kind, child));
            index = close + 1;
        } else {
            return SoundError::UnknownKey {
                name: name.to_string(),
                key,
                index,
            }
            .to_result();
        }
    }
}

/// Named top level blocks of a soundscript or soundscape file. Names are lowercase.
pub fn parse_soundscript(text: &str) -> Result<Vec<(String, SoundBlock)>, SoundError> {
    let text = strip_line_comments(text, &['"']);

    let lexed = Lexed::new(&text, &['"'])?;
    let tokens = lexed.tokens("{}", false);

    check_depth(&tokens, "{", "}", 0, MAX_DEPTH)?;

    let mut res = vec![];
    let mut index = 0;

    while index < tokens.len() {
        if !tokens[index].is("{") {
            index += 1;
            continue;
        }

        let name = index
            .checked_sub(1)
            .and_then(|previous| lexed.text(&tokens[previous]))
            .map(str::to_lowercase);

        let Some(name) = name else {
            return SoundError::ExpectedToken {
                expected: "sound name",
                index,
            }
            .to_result();
        };

        let (block, close) = parse_block(&lexed, &tokens, index, &name)?;

        res.push((name, block));
        index = close + 1;
    }

    Ok(res)
}

/// Script paths listed as `"file" "scripts/x.txt"` or `"precache_file" "scripts/x.txt"`.
///
/// Only lines with exactly two quoted strings are entries.
pub fn parse_manifest(text: &str) -> Result<Vec<String>, SoundError> {
    let mut res = vec![];

    for line in text.lines() {
        let line = line.split("//").next().unwrap_or_default();

        let quoted: Vec<&str> = line.split('"').collect();

        // two literals split a line into five parts
        if quoted.len() != 5 {
            continue;
        }

        let (entry, path) = (quoted[1], quoted[3]);

        if !MANIFEST_ENTRIES
            .iter()
            .any(|known| entry.eq_ignore_ascii_case(known))
        {
            return SoundError::UnknownManifestEntry {
                entry: entry.to_string(),
            }
            .to_result();
        }

        res.push(path.to_string());
    }

    Ok(res)
}

/// Soundscripts and soundscapes of a Source game folder.
#[derive(Debug, Clone, Default)]
pub struct SoundScriptDatabase {
    pub soundscripts: HashMap<String, SoundBlock>,
    pub soundscapes: HashMap<String, SoundBlock>,
    /// `.wav` files on disk, relative to the game root.
    pub files: Vec<String>,
}

fn load_manifest(
    game_root: &Path,
    manifest: &str,
    into: &mut HashMap<String, SoundBlock>,
) -> Result<(), SoundError> {
    let manifest_path = game_root.join(manifest);
    let entries = parse_manifest(&read_text(&manifest_path)?)
        .map_err(|err| err.in_file(&manifest_path))?;

    for entry in entries {
        let path = game_root.join(entry.replace('\\', "/"));

        if !path.is_file() {
            debug!("{manifest}: `{}` is not a file", path.display());
            continue;
        }

        let text = read_text(&path)?;

        for (name, block) in parse_soundscript(&text).map_err(|err| err.in_file(&path))? {
            if into.insert(name.clone(), block).is_some() {
                debug!("`{name}` is redefined in `{}`", path.display());
            }
        }
    }

    Ok(())
}

impl SoundScriptDatabase {
    /// Reads both manifests below `game_root`. Later definitions replace earlier ones.
    pub fn scan(game_root: impl AsRef<Path>) -> Result<Self, SoundError> {
        let game_root = game_root.as_ref();

        let mut res = Self::default();

        load_manifest(game_root, SOUNDSCRIPTS_MANIFEST, &mut res.soundscripts)?;
        load_manifest(game_root, SOUNDSCAPES_MANIFEST, &mut res.soundscapes)?;

        res.files = sound_files(game_root, &[".wav"])?;

        info!(
            "Loaded {} soundscripts, {} soundscapes and {} sound files",
            res.soundscripts.len(),
            res.soundscapes.len(),
            res.files.len()
        );

        Ok(res)
    }

    /// Every wave played by a soundscript or soundscape, following `playsoundscape`.
    ///
    /// `None` when the name is neither.
    pub fn all_sounds(&self, name: &str) -> Result<Option<Vec<String>>, SoundError> {
        let name = name.to_lowercase();

        let block = match (self.soundscripts.get(&name), self.soundscapes.get(&name)) {
            (Some(_), Some(_)) => return SoundError::AmbiguousSound { name }.to_result(),
            (Some(block), None) | (None, Some(block)) => block,
            (None, None) => {
                debug!("`{name}` is not a soundscript or soundscape");
                return Ok(None);
            }
        };

        let mut res = vec![];
        let mut visiting = vec![name];

        self.collect_waves(block, &mut visiting, &mut res);

        Ok(Some(res))
    }

    fn collect_waves(&self, block: &SoundBlock, visiting: &mut Vec<String>, res: &mut Vec<String>) {
        for entry in &block.entries {
            match entry {
                SoundEntry::KeyValue(key, wave) if key == WAVE => res.push(normalize_path(wave)),
                SoundEntry::KeyValue(..) => (),
                SoundEntry::Block(BlockKind::PlaySoundscape, child) => {
                    let Some(name) = child.get("name").map(str::to_lowercase) else {
                        continue;
                    };

                    if visiting.contains(&name) {
                        debug!("Soundscape `{name}` plays itself");
                        continue;
                    }

                    let Some(soundscape) = self.soundscapes.get(&name) else {
                        debug!("Unknown soundscape `{name}`");
                        continue;
                    };

                    visiting.push(name);
                    self.collect_waves(soundscape, visiting, res);
                    visiting.pop();
                }
                SoundEntry::Block(_, child) => self.collect_waves(child, visiting, res),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    const GAME_SOUNDS: &str = r#"
"Door.Open"
{
	"channel"	"CHAN_STATIC"
	"volume"	"0.8"
	"soundlevel"	"SNDLVL_75dB"
	"rndwave"
	{
		"wave"	"doors/door_open1.wav" // first
		"wave"	"doors/door_open2.wav"
	}
}

"Ambient.Wind"
{
	"wave" "ambient/wind.wav"
}
"#;

    const SOUNDSCAPES: &str = r#"
"canals.outside"
{
	"dsp"	"1"
	"playlooping"
	{
		"volume"	"0.4"
		"wave"	"ambient/water/drip1.wav"
	}
	"playrandom"
	{
		"time"	"10,20"
		"rndwave"
		{
			"wave"	"ambient/birds/bird1.wav"
		}
	}
	"playsoundscape"
	{
		"name"	"Canals.Util"
		"volume"	"0.5"
	}
}

"canals.util"
{
	"playlooping" { "wave" "ambient/hum.wav" }
	"playsoundscape" { "name" "canals.outside" }
	"playsoundscape" { "name" "missing.scape" }
}
"#;

    #[test]
    fn nested_blocks() {
        let scripts = parse_soundscript(GAME_SOUNDS).unwrap();

        assert_eq!(scripts.len(), 2);

        let (name, door) = &scripts[0];
        assert_eq!(name, "door.open");
        assert_eq!(door.get("channel"), Some("CHAN_STATIC"));
        assert_eq!(door.waves().count(), 0);

        let rndwave = door.blocks(BlockKind::RndWave).next().unwrap();
        assert_eq!(
            rndwave.waves().collect::<Vec<_>>(),
            vec!["doors/door_open1.wav", "doors/door_open2.wav"]
        );
    }

    #[test]
    fn malformed_scripts() {
        assert!(matches!(
            parse_soundscript(r#""a" { "pitchshift" "1" }"#),
            Err(SoundError::UnknownKey { .. })
        ));
        assert!(parse_soundscript(r#""a" { "wave" }"#).is_err());
        assert!(parse_soundscript(r#""a" { "rndwave" "wave" }"#).is_err());
        assert!(parse_soundscript(r#"{ "wave" "a.wav" }"#).is_err());
        assert!(parse_soundscript(
            r#""a" { "playrandom" { "rndwave" { "rndwave" { "wave" "a.wav" } } } }"#
        )
        .is_err());
    }

    #[test]
    fn manifest_entries() {
        let manifest = r#"
game_sounds_manifest
{
	"precache_file"	"scripts/game_sounds.txt"
	"file"		"scripts/npc_sounds.txt" // npc
	// "file" "scripts/commented.txt"
}
"#;

        assert_eq!(
            parse_manifest(manifest).unwrap(),
            vec!["scripts/game_sounds.txt", "scripts/npc_sounds.txt"]
        );
        assert!(matches!(
            parse_manifest(r#""include" "scripts/x.txt""#),
            Err(SoundError::UnknownManifestEntry { .. })
        ));
    }

    fn game_folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::create_dir_all(dir.path().join("sound/ambient")).unwrap();

        fs::write(
            scripts.join("game_sounds_manifest.txt"),
            "game_sounds_manifest\n{\n\"file\" \"scripts/game_sounds.txt\"\n\"file\" \"scripts/missing.txt\"\n}",
        )
        .unwrap();
        fs::write(
            scripts.join("soundscapes_manifest.txt"),
            "soundscapes_manifest\n{\n\"file\" \"scripts/soundscapes.txt\"\n}",
        )
        .unwrap();
        fs::write(scripts.join("game_sounds.txt"), GAME_SOUNDS).unwrap();
        fs::write(scripts.join("soundscapes.txt"), SOUNDSCAPES).unwrap();
        fs::write(dir.path().join("sound/ambient/wind.wav"), "").unwrap();

        dir
    }

    #[test]
    fn sounds_through_soundscapes() {
        let dir = game_folder();
        let database = SoundScriptDatabase::scan(dir.path()).unwrap();

        assert_eq!(database.soundscripts.len(), 2);
        assert_eq!(database.soundscapes.len(), 2);
        assert_eq!(database.files, vec!["sound/ambient/wind.wav"]);

        assert_eq!(
            database.all_sounds("DOOR.OPEN").unwrap(),
            Some(vec![
                "doors/door_open1.wav".to_string(),
                "doors/door_open2.wav".to_string()
            ])
        );
        assert_eq!(
            database.all_sounds("canals.outside").unwrap(),
            Some(vec![
                "ambient/water/drip1.wav".to_string(),
                "ambient/birds/bird1.wav".to_string(),
                "ambient/hum.wav".to_string(),
            ])
        );
        assert_eq!(
            database.all_sounds("canals.util").unwrap(),
            Some(vec![
                "ambient/hum.wav".to_string(),
                "ambient/water/drip1.wav".to_string(),
                "ambient/birds/bird1.wav".to_string(),
            ])
        );
        assert_eq!(database.all_sounds("nothing").unwrap(), None);
    }

    #[test]
    fn waves_are_normalized() {
        let dir = game_folder();
        fs::write(
            dir.path().join("scripts/game_sounds.txt"),
            r#""Door.Open" { "wave" "Doors\Door_Open.WAV" "rndwave" { "wave" "Doors//Slam.wav" } }"#,
        )
        .unwrap();

        let database = SoundScriptDatabase::scan(dir.path()).unwrap();
        let door = &database.soundscripts["door.open"];

        assert_eq!(door.waves().collect::<Vec<_>>(), vec!["doors/door_open.wav"]);
        assert_eq!(
            database.all_sounds("door.open").unwrap(),
            Some(vec![
                "doors/door_open.wav".to_string(),
                "doors/slam.wav".to_string()
            ])
        );
    }

    #[test]
    fn name_in_both_tables() {
        let dir = game_folder();
        fs::write(
            dir.path().join("scripts/soundscapes.txt"),
            format!("{SOUNDSCAPES}\n\"ambient.wind\" {{ \"dsp\" \"0\" }}"),
        )
        .unwrap();

        let database = SoundScriptDatabase::scan(dir.path()).unwrap();

        assert!(matches!(
            database.all_sounds("Ambient.Wind"),
            Err(SoundError::AmbiguousSound { .. })
        ));
    }
}
