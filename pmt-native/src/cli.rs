use std::path::PathBuf;

use clap::{Parser, Subcommand};
use def::DefDatabase;
use fgd::FgdDatabase;
use log::debug;
use materials::{scan_mtr, scan_vmt, UnrealTextureDatabase};
use pmt::{
    config::{parse_config, parse_config_from_file},
    err, export_scene, load_scene, roundtrip, Engine, Session,
};
use serde::Serialize;
use sounds::{SoundScriptDatabase, SoundShaderDatabase, UnrealSoundDatabase};
use uc::UcDatabase;

pub enum CliRes {
    Ok,
    Err,
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct PmtCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scans `.fgd` files
    Fgd {
        root: PathBuf,
        /// Prints one class as json
        #[arg(long)]
        class: Option<String>,
    },
    /// Scans `.uc` files
    Uc {
        root: PathBuf,
        /// Prints one class as json
        #[arg(long)]
        class: Option<String>,
    },
    /// Scans idTech4 `.def` files
    Def {
        root: PathBuf,
        /// Prints one entity def as json
        #[arg(long)]
        class: Option<String>,
    },
    /// Scans materials, or textures for t3d
    Materials {
        engine: Engine,
        root: PathBuf,
        /// Folder of `.png` conversions
        #[arg(long)]
        textures: Option<PathBuf>,
    },
    /// Scans soundscripts, sound shaders or unreal sounds
    Sounds { engine: Engine, root: PathBuf },
    /// Exports a json scene
    Export {
        engine: Engine,
        scene: PathBuf,
        out: PathBuf,
    },
    /// Imports a level file and writes it back
    Roundtrip { file: PathBuf, out: Option<PathBuf> },
    /// Builds every database of the configured folders
    Scan {
        /// Defaults to `config.toml` next to the binary
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    count: usize,
    names: Vec<&'a str>,
}

fn print_json(value: &impl Serialize) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn print_one<T: Serialize>(kind: &str, name: &str, value: Option<&T>) -> eyre::Result<()> {
    match value {
        Some(value) => print_json(value),
        None => err!("Cannot find {kind} `{name}`"),
    }
}

fn run(command: Commands) -> eyre::Result<()> {
    debug!("{command:?}");

    match command {
        Commands::Fgd { root, class } => {
            let database = FgdDatabase::scan(root)?;

            match class {
                Some(class) => print_one("class", &class, database.get(&class)),
                None => print_json(&Summary {
                    count: database.len(),
                    names: database
                        .placeable_classes()
                        .map(|class| class.classname.as_str())
                        .collect(),
                }),
            }
        }
        Commands::Uc { root, class } => {
            let database = UcDatabase::scan(root)?;

            match class {
                Some(class) => print_one("class", &class, database.get(&class)),
                None => print_json(&Summary {
                    count: database.len(),
                    names: database
                        .classes()
                        .map(|class| class.classname.as_str())
                        .collect(),
                }),
            }
        }
        Commands::Def { root, class } => {
            let database = DefDatabase::scan(root)?;

            match class {
                Some(class) => print_one("entity def", &class, database.get(&class)),
                None => print_json(&Summary {
                    count: database.len(),
                    names: database.defs().map(|def| def.name.as_str()).collect(),
                }),
            }
        }
        Commands::Materials {
            engine,
            root,
            textures,
        } => {
            let database = match engine {
                Engine::Vmf => scan_vmt(&root, textures.as_deref())?,
                Engine::Map => scan_mtr(&root, textures.as_deref())?,
                Engine::T3d => {
                    let database = UnrealTextureDatabase::scan(&root)?;

                    return print_json(&Summary {
                        count: database.len(),
                        names: database.unreal_paths().collect(),
                    });
                }
            };

            print_json(&database.records().collect::<Vec<_>>())
        }
        Commands::Sounds { engine, root } => match engine {
            Engine::Vmf => {
                let database = SoundScriptDatabase::scan(&root)?;

                let mut names: Vec<&str> = database
                    .soundscripts
                    .keys()
                    .chain(database.soundscapes.keys())
                    .map(String::as_str)
                    .collect();
                names.sort();

                print_json(&Summary {
                    count: names.len(),
                    names,
                })
            }
            Engine::T3d => {
                let database = UnrealSoundDatabase::scan(&root)?;

                print_json(&Summary {
                    count: database.len(),
                    names: database.unreal_paths().collect(),
                })
            }
            Engine::Map => {
                let database = SoundShaderDatabase::scan(&root, Some(root.as_path()))?;

                print_json(&database.shaders().collect::<Vec<_>>())
            }
        },
        Commands::Export { engine, scene, out } => {
            let scene = load_scene(&scene)?;

            export_scene(engine, &scene, &out)
        }
        Commands::Roundtrip { file, out } => {
            let written = roundtrip(&file, out.as_deref())?;

            println!("{}", written.display());

            Ok(())
        }
        Commands::Scan { config } => {
            let config = match config {
                Some(path) => parse_config_from_file(&path)?,
                None => parse_config()?,
            };

            let session = Session::from_config(&config)?;

            for engine in Engine::ALL {
                println!("[{engine}]");

                for (name, count) in session.summary(engine) {
                    println!("{name} = {count}");
                }
            }

            Ok(())
        }
    }
}

pub fn cli() -> CliRes {
    let cli = PmtCli::parse();

    match run(cli.command) {
        Ok(_) => CliRes::Ok,
        Err(err) => {
            println!("{err:?}");
            CliRes::Err
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    fn parse(args: &[&str]) -> Commands {
        PmtCli::try_parse_from(std::iter::once("pmt").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn engines_by_name() {
        assert!(matches!(
            parse(&["materials", "map", "base/materials", "--textures", "base/png"]),
            Commands::Materials {
                engine: Engine::Map,
                textures: Some(_),
                ..
            }
        ));
        assert!(matches!(
            parse(&["export", "t3d", "scene.json", "out.t3d"]),
            Commands::Export {
                engine: Engine::T3d,
                ..
            }
        ));
        assert!(PmtCli::try_parse_from(["pmt", "sounds", "quake", "x"]).is_err());
    }

    #[test]
    fn roundtrip_output_is_optional() {
        assert!(matches!(
            parse(&["roundtrip", "a.vmf"]),
            Commands::Roundtrip { out: None, .. }
        ));
        assert!(matches!(
            parse(&["scan"]),
            Commands::Scan { config: None }
        ));
    }

    #[test]
    fn missing_class_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.fgd"),
            "@PointClass = info_target : \"Target\" []\n",
        )
        .unwrap();

        let root = dir.path().to_path_buf();

        assert!(run(Commands::Fgd {
            root: root.clone(),
            class: Some("info_target".to_string()),
        })
        .is_ok());

        let err = run(Commands::Fgd {
            root,
            class: Some("info_missing".to_string()),
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "Cannot find class `info_missing`");
    }
}
