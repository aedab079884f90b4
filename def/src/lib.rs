//! idTech4 `.def` entity definitions.
use std::{collections::HashMap, path::Path};

use common::files::{find_all_files, read_text};
use log::{info, warn};

mod error;
mod parser;
mod types;

pub use error::DefError;
pub use parser::parse_def;
pub use types::*;

/// Every entityDef found under a directory, with inheritance resolved.
#[derive(Debug, Clone, Default)]
pub struct DefDatabase {
    defs: Vec<EntityDef>,
    by_name: HashMap<String, usize>,
}

impl DefDatabase {
    /// Parses every `.def` below `root`.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, DefError> {
        let mut defs = vec![];

        for (_, path) in find_all_files(root, ".def")? {
            let text = read_text(&path)?;
            let parsed = parse_def(&text).map_err(|err| err.in_file(&path))?;

            defs.extend(parsed);
        }

        let res = Self::from_defs(defs)?;

        info!("Loaded {} entityDefs", res.len());

        Ok(res)
    }

    /// Builds the database from parsed definitions. The first definition of a name wins.
    pub fn from_defs(defs: impl IntoIterator<Item = EntityDef>) -> Result<Self, DefError> {
        let mut res = Self::default();

        for def in defs {
            let key = def.name.to_lowercase();

            if res.by_name.contains_key(&key) {
                warn!("entityDef `{}` is defined more than once", def.name);
                continue;
            }

            res.by_name.insert(key, res.defs.len());
            res.defs.push(def);
        }

        res.resolve()?;

        Ok(res)
    }

    pub fn get(&self, name: &str) -> Option<&EntityDef> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&index| &self.defs[index])
    }

    pub fn defs(&self) -> impl Iterator<Item = &EntityDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Follows `inherit` keys, nearest first.
    fn chain(&self, index: usize) -> Result<Vec<String>, DefError> {
        let def = &self.defs[index];
        let mut res: Vec<String> = vec![];
        let mut current = def;

        while let Some(parent) = current.inherit() {
            let seen = parent.eq_ignore_ascii_case(&def.name)
                || res.iter().any(|name| name.eq_ignore_ascii_case(parent));

            if seen {
                return DefError::InheritanceCycle {
                    name: def.name.clone(),
                }
                .to_result();
            }

            res.push(parent.to_string());

            match self.get(parent) {
                Some(next) => current = next,
                None => {
                    warn!("entityDef `{}` inherits unknown `{parent}`", def.name);
                    break;
                }
            }
        }

        Ok(res)
    }

    fn resolve(&mut self) -> Result<(), DefError> {
        let chains = (0..self.defs.len())
            .map(|index| self.chain(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut resolved = Vec::with_capacity(chains.len());

        for (def, chain) in self.defs.iter().zip(&chains) {
            let mut all_properties = def.properties.clone();

            for ancestor in chain.iter().filter_map(|name| self.get(name)) {
                for property in &ancestor.properties {
                    if !all_properties.iter().any(|p| p.key == property.key) {
                        all_properties.push(property.clone());
                    }
                }
            }

            resolved.push(all_properties);
        }

        for ((def, chain), all_properties) in self.defs.iter_mut().zip(chains).zip(resolved) {
            def.inheritance_chain = chain;
            def.all_properties = all_properties;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    const DEFS: &str = r#"
entityDef func_mover {
	"editor_var accel_time"	"acceleration time"
	"editor_var solid"		"whether the mover is solid"
	"spawnclass"			"idMover"
	"solid"					"1"
	"accel_time"			"0"
}

entityDef func_door {
	"inherit"				"func_mover"
	"editor_bool locked"	"door starts locked"
	"solid"					"0"
	"spawnclass"			"idDoor"
}

entityDef func_door_locked {
	"inherit"				"Func_Door"
	"locked"				"1"
}
"#;

    #[test]
    fn inherited_keys() {
        let database = DefDatabase::from_defs(parse_def(DEFS).unwrap()).unwrap();
        let locked = database.get("FUNC_DOOR_LOCKED").unwrap();

        assert_eq!(locked.inheritance_chain, vec!["Func_Door", "func_mover"]);

        let all: Vec<(&str, &str)> = locked.all_keyvalues().collect();
        assert_eq!(
            all,
            vec![
                ("inherit", "Func_Door"),
                ("locked", "1"),
                ("solid", "0"),
                ("spawnclass", "idDoor"),
                ("accel_time", "0"),
            ]
        );

        // own value without a directive does not pick up the ancestor's
        assert_eq!(locked.all_property("locked").unwrap().editor_tag, None);

        let editor: Vec<&str> = locked
            .all_editor_properties()
            .map(|property| property.key.as_str())
            .collect();
        assert_eq!(editor, vec!["accel_time"]);

        let door = database.get("func_door").unwrap();
        assert_eq!(door.all_editor_properties().count(), 2);
        assert_eq!(door.all_property("solid").unwrap().value.as_deref(), Some("0"));
    }

    #[test]
    fn inherited_property_closure() {
        let database = DefDatabase::from_defs(parse_def(DEFS).unwrap()).unwrap();

        for def in database.defs() {
            for property in &def.properties {
                assert_eq!(def.all_property(&property.key), Some(property));
            }

            for ancestor in def.inheritance_chain.iter().filter_map(|name| database.get(name)) {
                for property in &ancestor.properties {
                    assert!(def.all_property(&property.key).is_some());
                }
            }
        }
    }

    #[test]
    fn cycles_and_unknown_parents() {
        let defs = parse_def(
            "entityDef a { inherit b }\nentityDef b { inherit c }\nentityDef c { inherit a }",
        )
        .unwrap();

        assert!(matches!(
            DefDatabase::from_defs(defs),
            Err(DefError::InheritanceCycle { .. })
        ));

        let defs = parse_def("entityDef a { inherit missing x 1 }\nentityDef a { y 2 }").unwrap();
        let database = DefDatabase::from_defs(defs).unwrap();
        let a = database.get("a").unwrap();

        assert_eq!(database.len(), 1);
        assert_eq!(a.inheritance_chain, vec!["missing"]);
        assert_eq!(a.all_keyvalues().count(), 2);
    }

    #[test]
    fn scan_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("def")).unwrap();
        fs::write(dir.path().join("def/movers.def"), DEFS).unwrap();
        fs::write(dir.path().join("def/other.DEF"), "entityDef light { \"spawnclass\" \"idLight\" }").unwrap();

        let database = DefDatabase::scan(dir.path()).unwrap();

        assert_eq!(database.len(), 4);
        assert_eq!(
            database.get("light").unwrap().keyvalues().collect::<Vec<_>>(),
            vec![("spawnclass", "idLight")]
        );

        fs::write(dir.path().join("def/broken.def"), "entityDef a { \"unpaired\" }").unwrap();

        assert!(matches!(
            DefDatabase::scan(dir.path()),
            Err(DefError::InFile { .. })
        ));
    }
}
