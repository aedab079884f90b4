//! Source engine `.fgd` entity class definitions.
use std::{
    collections::{HashMap, VecDeque},
    path::Path,
};

use common::files::{find_all_files, read_text};
use log::{info, warn};

mod error;
mod parser;
mod types;

pub use error::FgdError;
pub use parser::parse_fgd;
pub use types::*;

const SPAWNFLAGS: &str = "spawnflags";

/// Every class found under a directory, with inheritance resolved.
#[derive(Debug, Clone, Default)]
pub struct FgdDatabase {
    classes: Vec<EntityClass>,
    by_name: HashMap<String, usize>,
}

impl FgdDatabase {
    /// Parses every `.fgd` below `root`.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, FgdError> {
        let mut classes = vec![];

        for (_, path) in find_all_files(root, ".fgd")? {
            let text = read_text(&path)?;
            let parsed = parse_fgd(&text).map_err(|err| err.in_file(&path))?;

            classes.extend(parsed);
        }

        let res = Self::from_classes(classes)?;

        info!("Loaded {} fgd classes", res.len());

        Ok(res)
    }

    /// Builds the database from parsed classes. The first definition of a name wins.
    pub fn from_classes(classes: impl IntoIterator<Item = EntityClass>) -> Result<Self, FgdError> {
        let mut res = Self::default();

        for class in classes {
            if res.by_name.contains_key(&class.classname) {
                warn!("Class `{}` is defined more than once", class.classname);
                continue;
            }

            res.by_name.insert(class.classname.clone(), res.classes.len());
            res.classes.push(class);
        }

        res.resolve()?;

        Ok(res)
    }

    pub fn get(&self, classname: &str) -> Option<&EntityClass> {
        self.by_name
            .get(&classname.to_lowercase())
            .map(|&index| &self.classes[index])
    }

    pub fn classes(&self) -> impl Iterator<Item = &EntityClass> {
        self.classes.iter()
    }

    pub fn placeable_classes(&self) -> impl Iterator<Item = &EntityClass> {
        self.classes.iter().filter(|class| class.is_placeable())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Breadth first walk over `base(...)` parents, self first.
    fn hierarchy(&self, index: usize) -> Result<Vec<String>, FgdError> {
        let classname = &self.classes[index].classname;

        let mut res = vec![classname.clone()];
        let mut queue = VecDeque::from([index]);

        while let Some(current) = queue.pop_front() {
            for parent in &self.classes[current].parents {
                if parent == classname {
                    return FgdError::InheritanceCycle {
                        classname: classname.clone(),
                    }
                    .to_result();
                }

                if res.contains(parent) {
                    continue;
                }

                res.push(parent.clone());

                match self.by_name.get(parent) {
                    Some(&parent_index) => queue.push_back(parent_index),
                    None => warn!("Class `{classname}` has unknown parent `{parent}`"),
                }
            }
        }

        Ok(res)
    }

    fn resolve(&mut self) -> Result<(), FgdError> {
        let hierarchies = (0..self.classes.len())
            .map(|index| self.hierarchy(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut resolved = Vec::with_capacity(hierarchies.len());

        for (index, hierarchy) in hierarchies.iter().enumerate() {
            let classname = &self.classes[index].classname;
            let ancestors: Vec<&EntityClass> = hierarchy
                .iter()
                .filter_map(|name| self.by_name.get(name))
                .map(|&index| &self.classes[index])
                .collect();

            let mut all_properties: Vec<Property> = vec![];
            let mut all_io: Vec<InputOutput> = vec![];

            for class in &ancestors {
                for property in &class.properties {
                    match all_properties
                        .iter()
                        .find(|p| p.name.eq_ignore_ascii_case(&property.name))
                    {
                        Some(existing) => {
                            if existing.type_name() != property.type_name() {
                                warn!(
                                    "Class `{classname}` inherits property `{}` as both `{}` and `{}`",
                                    property.name,
                                    existing.type_name(),
                                    property.type_name()
                                );
                            }
                        }
                        None => all_properties.push(property.clone()),
                    }
                }

                for io in &class.io {
                    match all_io
                        .iter()
                        .find(|other| other.kind == io.kind && other.name == io.name)
                    {
                        Some(existing) => {
                            if existing.argument_type != io.argument_type {
                                warn!(
                                    "Class `{classname}` inherits io `{}` as both `{}` and `{}`",
                                    io.name, existing.argument_type, io.argument_type
                                );
                            }
                        }
                        None => all_io.push(io.clone()),
                    }
                }
            }

            merge_spawnflags(&mut all_properties, &ancestors);

            resolved.push((all_properties, all_io));
        }

        for ((class, hierarchy), (all_properties, all_io)) in self
            .classes
            .iter_mut()
            .zip(hierarchies)
            .zip(resolved)
        {
            class.inheritance_chain = hierarchy[1..].to_vec();
            class.class_hierarchy = hierarchy;
            class.all_properties = all_properties;
            class.all_io = all_io;
        }

        Ok(())
    }
}

/// Adds ancestor spawnflags bits missing from the nearest definition, then recomputes the default.
fn merge_spawnflags(all_properties: &mut [Property], ancestors: &[&EntityClass]) {
    let Some(spawnflags) = all_properties
        .iter_mut()
        .find(|property| property.name.eq_ignore_ascii_case(SPAWNFLAGS))
    else {
        return;
    };

    let PropertyKind::Flags(flags) = &mut spawnflags.kind else {
        return;
    };

    for class in ancestors {
        let Some(inherited) = class.property(SPAWNFLAGS).and_then(Property::flags) else {
            continue;
        };

        for flag in inherited {
            if !flags.iter().any(|existing| existing.bit == flag.bit) {
                flags.push(flag.clone());
            }
        }
    }

    spawnflags.default = DefaultValue::FlagsMask(flags_default_value(flags));
}
