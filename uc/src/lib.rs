//! Unreal Engine 1 `.uc` class scripts.
use std::{collections::HashMap, path::Path};

use common::files::{find_all_files, read_text};
use log::{debug, info, warn};

mod defaults;
mod error;
mod parser;
mod types;

pub use defaults::split_struct_value;
pub use error::UcError;
pub use parser::{class_location, parse_uc};
pub use types::*;

/// Every class found under a directory, with inheritance resolved.
#[derive(Debug, Clone, Default)]
pub struct UcDatabase {
    classes: Vec<UnrealClass>,
    by_name: HashMap<String, usize>,
    structs: HashMap<String, UnrealStruct>,
    enums: HashMap<String, UnrealEnum>,
}

impl UcDatabase {
    /// Parses every `.uc` below `root`, which holds one directory per package.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, UcError> {
        let mut classes = vec![];

        for (_, path) in find_all_files(root, ".uc")? {
            let text = read_text(&path)?;
            let class = parse_uc(&text, &path).map_err(|err| err.in_file(&path))?;

            classes.push(class);
        }

        let res = Self::from_classes(classes)?;

        info!(
            "Loaded {} unreal classes, {} structs, {} enums",
            res.len(),
            res.structs.len(),
            res.enums.len()
        );

        Ok(res)
    }

    /// Builds the database from parsed classes. The first definition of a name wins.
    pub fn from_classes(classes: impl IntoIterator<Item = UnrealClass>) -> Result<Self, UcError> {
        let mut res = Self::default();

        for class in classes {
            if res.by_name.contains_key(&class.classname) {
                warn!("Class `{}` is defined more than once", class.classname);
                continue;
            }

            for declared in &class.structs {
                if res.structs.contains_key(&declared.name) {
                    warn!("Struct `{}` is defined more than once", declared.name);
                    continue;
                }

                res.structs.insert(declared.name.clone(), declared.clone());
            }

            for declared in &class.enums {
                if res.enums.contains_key(&declared.name) {
                    warn!("Enum `{}` is defined more than once", declared.name);
                    continue;
                }

                res.enums.insert(declared.name.clone(), declared.clone());
            }

            res.by_name.insert(class.classname.clone(), res.classes.len());
            res.classes.push(class);
        }

        for name in res.structs.keys() {
            if res.enums.contains_key(name) {
                warn!("`{name}` is defined as both a struct and an enum");
            }
        }

        res.resolve()?;

        Ok(res)
    }

    pub fn get(&self, classname: &str) -> Option<&UnrealClass> {
        self.by_name
            .get(&classname.to_lowercase())
            .map(|&index| &self.classes[index])
    }

    pub fn classes(&self) -> impl Iterator<Item = &UnrealClass> {
        self.classes.iter()
    }

    pub fn get_struct(&self, name: &str) -> Option<&UnrealStruct> {
        self.structs.get(&name.to_lowercase())
    }

    pub fn get_enum(&self, name: &str) -> Option<&UnrealEnum> {
        self.enums.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classifies a variable type by the definitions in this database.
    pub fn var_type(&self, type_name: &str) -> Result<VarType, UcError> {
        let type_name = type_name.to_lowercase();

        if BUILTIN_TYPES.contains(&type_name.as_str()) {
            return Ok(VarType::Builtin(type_name));
        }

        let is_enum = self.enums.contains_key(&type_name);
        let is_struct = self.structs.contains_key(&type_name);
        let is_class = self.by_name.contains_key(&type_name);
        let is_reference = type_name.contains("class<") && type_name.ends_with('>');

        let count = [is_enum, is_struct, is_class, is_reference]
            .into_iter()
            .filter(|&is| is)
            .count();

        if count > 1 {
            return UcError::AmbiguousType {
                type_name,
                is_enum,
                is_struct,
                is_class: is_class || is_reference,
            }
            .to_result();
        }

        match (is_enum, is_struct, is_class || is_reference) {
            (true, _, _) => Ok(VarType::Enum(type_name)),
            (_, true, _) => Ok(VarType::Struct(type_name)),
            (_, _, true) => Ok(VarType::Class(type_name)),
            _ => UcError::UnknownType { type_name }.to_result(),
        }
    }

    /// Zero value of a type as UnrealEd writes it.
    ///
    /// Structs expand to `(a=...,b=(c=...))`, enums give their first value and
    /// object references give `none`.
    pub fn get_empty_default(&self, type_name: &str) -> Result<String, UcError> {
        self.empty_default(type_name, &mut vec![])
    }

    fn empty_default(&self, type_name: &str, expanding: &mut Vec<String>) -> Result<String, UcError> {
        match self.var_type(type_name)? {
            VarType::Builtin(name) => Ok(builtin_default(&name).unwrap_or("none").to_string()),
            VarType::Enum(name) => Ok(self
                .enums
                .get(&name)
                .and_then(|declared| declared.values.first())
                .cloned()
                .unwrap_or_default()),
            VarType::Class(_) => Ok("none".to_string()),
            VarType::Struct(name) => {
                if expanding.contains(&name) {
                    return UcError::RecursiveStruct { name }.to_result();
                }

                let Some(declared) = self.structs.get(&name) else {
                    return UcError::UnknownType { type_name: name }.to_result();
                };

                expanding.push(name);

                let fields = declared
                    .variables
                    .iter()
                    .map(|var| {
                        self.empty_default(&var.type_name, expanding)
                            .map(|value| format!("{}={}", var.name, value))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                expanding.pop();

                Ok(format!("({})", fields.join(",")))
            }
        }
    }

    /// Ancestors of a class, nearest first, and whether the chain reaches a root class.
    fn chain(&self, index: usize) -> Result<(Vec<String>, bool), UcError> {
        let classname = &self.classes[index].classname;

        let mut res: Vec<String> = vec![];
        let mut parent = self.classes[index].parent.clone();

        while let Some(name) = parent {
            if &name == classname || res.contains(&name) {
                return UcError::InheritanceCycle {
                    classname: classname.clone(),
                }
                .to_result();
            }

            parent = match self.by_name.get(&name) {
                Some(&parent_index) => self.classes[parent_index].parent.clone(),
                None => {
                    debug!("Class `{classname}` has unknown ancestor `{name}`");
                    res.push(name);

                    return Ok((res, false));
                }
            };

            res.push(name);
        }

        Ok((res, true))
    }

    fn resolve(&mut self) -> Result<(), UcError> {
        let chains = (0..self.classes.len())
            .map(|index| self.chain(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut resolved = Vec::with_capacity(chains.len());

        for (index, (chain, _)) in chains.iter().enumerate() {
            let class = &self.classes[index];

            let mut all_variables = class.variables.clone();
            let mut all_default_properties = class.default_properties.clone();

            for ancestor in chain.iter().filter_map(|name| self.get(name)) {
                for var in &ancestor.variables {
                    if !all_variables.iter().any(|other| other.name == var.name) {
                        all_variables.push(var.clone());
                    }
                }

                for (name, value) in &ancestor.default_properties {
                    if !all_default_properties.contains_key(name) {
                        all_default_properties.push(name.as_str(), value.as_str());
                    }
                }
            }

            resolved.push((all_variables, all_default_properties));
        }

        for ((class, (chain, complete)), (all_variables, all_default_properties)) in
            self.classes.iter_mut().zip(chains).zip(resolved)
        {
            class.inheritance_chain = chain;
            class.all_variables = all_variables;
            class.all_default_properties = all_default_properties;

            if complete {
                validate_default_properties(class)?;
            }
        }

        Ok(())
    }
}

/// Every default property must name a variable of the class or its ancestors.
fn validate_default_properties(class: &UnrealClass) -> Result<(), UcError> {
    for name in class.all_default_properties.keys() {
        let variable = name.split(['(', '[']).next().unwrap_or(name);

        if class.all_variable(variable).is_none() {
            return UcError::UnknownDefaultProperty {
                classname: class.classname.clone(),
                property: name.to_string(),
            }
            .to_result();
        }
    }

    Ok(())
}
