use std::path::{Path, PathBuf};

use common::{files::read_text, scene::Scene};
use eyre::WrapErr;
use log::info;
use map::{scene_to_map, Map};
use t3d::{scene_to_t3d, T3dMap};
use vmf::{scene_to_vmf, Vmf};

use crate::{err, Engine};

/// Scene serialized as json.
pub fn load_scene(path: &Path) -> eyre::Result<Scene> {
    let text = read_text(path)?;

    serde_json::from_str(&text).wrap_err_with(|| format!("Cannot parse scene `{}`", path.display()))
}

pub fn export_scene(engine: Engine, scene: &Scene, out: &Path) -> eyre::Result<()> {
    match engine {
        Engine::Vmf => scene_to_vmf(scene)?.write(out)?,
        Engine::T3d => scene_to_t3d(scene)?.write(out)?,
        Engine::Map => scene_to_map(scene)?.write(out)?,
    }

    info!("Exported {} primitives to `{}`", scene.primitives.len(), out.display());

    Ok(())
}

/// `<stem>_roundtrip.<extension>` next to the input.
fn roundtrip_path(input: &Path, engine: Engine) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    input.with_file_name(format!("{stem}_roundtrip.{}", engine.extension()))
}

/// Imports a level file and writes it back in the same format. Returns the written path.
pub fn roundtrip(input: &Path, output: Option<&Path>) -> eyre::Result<PathBuf> {
    let Some(engine) = Engine::from_path(input) else {
        return err!("Cannot tell the format of `{}`", input.display());
    };

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| roundtrip_path(input, engine));

    if output == input {
        return err!("Refusing to overwrite `{}`", input.display());
    }

    match engine {
        Engine::Vmf => Vmf::from_file(input)?.write(&output)?,
        Engine::T3d => T3dMap::from_file(input)?.write(&output)?,
        Engine::Map => Map::from_file(input)?.write(&output)?,
    }

    info!("Wrote `{}`", output.display());

    Ok(output)
}
