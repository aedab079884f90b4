//! Sound databases for idTech4 sound shaders, Source soundscripts and Unreal sounds.
use std::path::Path;

use common::{
    files::find_all_files,
    path::{normalize_fs_path, relative_key},
    CommonError,
};

mod error;
mod sndshd;
mod soundscript;
mod unreal;

pub use error::SoundError;
pub use sndshd::{parse_sndshd, SoundShader, SoundShaderDatabase};
pub use soundscript::{
    parse_manifest, parse_soundscript, BlockKind, SoundBlock, SoundEntry, SoundScriptDatabase,
};
pub use unreal::UnrealSoundDatabase;

/// Sound files below `root` with any of `suffixes`, relative to `root` and normalized.
pub fn sound_files(root: impl AsRef<Path>, suffixes: &[&str]) -> Result<Vec<String>, CommonError> {
    let root = root.as_ref();
    let root_key = normalize_fs_path(root);

    let mut res = vec![];

    for suffix in suffixes {
        for (_, path) in find_all_files(root, suffix)? {
            res.push(relative_key(&normalize_fs_path(&path), &root_key));
        }
    }

    res.sort();

    Ok(res)
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn files_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Sound/Ambient")).unwrap();
        fs::write(dir.path().join("Sound/Ambient/Wind.WAV"), "").unwrap();
        fs::write(dir.path().join("Sound/door.ogg"), "").unwrap();
        fs::write(dir.path().join("Sound/readme.txt"), "").unwrap();

        assert_eq!(
            sound_files(dir.path(), &[".wav", ".ogg"]).unwrap(),
            vec!["sound/ambient/wind.wav", "sound/door.ogg"]
        );
        assert_eq!(
            sound_files(dir.path(), &[".wav"]).unwrap(),
            vec!["sound/ambient/wind.wav"]
        );
    }
}
