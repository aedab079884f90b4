use common::KeyValues;
use glam::DVec3;
use serde::Serialize;

/// Types with a fixed empty default.
pub const BUILTIN_TYPES: [&str; 13] = [
    "bool", "byte", "int", "float", "string", "name", "object", "texture", "mesh", "model",
    "sound", "music", "iterator",
];

/// Empty default of a builtin type, as UnrealEd displays it.
pub fn builtin_default(type_name: &str) -> Option<&'static str> {
    match type_name {
        "bool" => Some("false"),
        "byte" | "int" => Some("0"),
        "float" => Some("0.000000"),
        "string" | "name" => Some(""),
        "object" | "texture" | "mesh" | "model" | "sound" | "music" | "iterator" => Some("none"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum VarType {
    Builtin(String),
    Enum(String),
    Struct(String),
    /// A class name, or a parametrized reference such as `class<actor>`.
    Class(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrealVar {
    /// Lowercase.
    pub name: String,
    /// Lowercase, e.g. `float`, `vector` or `class<actor>`.
    pub type_name: String,
    /// Static array length.
    pub length: Option<usize>,
    /// Declared with `var(...)`.
    pub editor_visible: bool,
    pub editor_category: Option<String>,
    pub editconst: bool,
}

impl UnrealVar {
    pub fn is_array(&self) -> bool {
        self.length.is_some()
    }

    /// Shown and editable in UnrealEd.
    pub fn is_editable(&self) -> bool {
        self.editor_visible && !self.editconst
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrealStruct {
    pub name: String,
    /// Members in declaration order.
    pub variables: Vec<UnrealVar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrealEnum {
    pub name: String,
    /// Enumerators by value.
    pub values: Vec<String>,
}

impl UnrealEnum {
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|other| other.eq_ignore_ascii_case(value))
    }
}

/// Vertex mesh imported by `#exec mesh import`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticMesh {
    /// `package.mesh`
    pub unreal_path: String,
    pub name: String,
    pub origin: DVec3,
    /// Roll, pitch and yaw in byte units, 256 per turn.
    pub rotation: DVec3,
    /// Roll, pitch and yaw in degrees.
    pub rotation_degrees: DVec3,
    pub scale: DVec3,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrealClass {
    /// Lowercase.
    pub package: String,
    /// Lowercase.
    pub classname: String,
    pub parent: Option<String>,
    pub variables: Vec<UnrealVar>,
    pub structs: Vec<UnrealStruct>,
    pub enums: Vec<UnrealEnum>,
    /// `defaultproperties` of this class only.
    pub default_properties: KeyValues,
    /// Lowercase `#` directive lines split into tokens.
    pub preprocessor: Vec<Vec<String>>,
    pub static_mesh: Option<StaticMesh>,
    /// Ancestors, nearest first.
    pub inheritance_chain: Vec<String>,
    pub all_variables: Vec<UnrealVar>,
    pub all_default_properties: KeyValues,
}

impl UnrealClass {
    /// `package.classname`
    pub fn unreal_path(&self) -> String {
        format!("{}.{}", self.package, self.classname)
    }

    pub fn is_a(&self, classname: &str) -> bool {
        self.classname.eq_ignore_ascii_case(classname)
            || self
                .inheritance_chain
                .iter()
                .any(|ancestor| ancestor.eq_ignore_ascii_case(classname))
    }

    pub fn variable(&self, name: &str) -> Option<&UnrealVar> {
        self.variables
            .iter()
            .find(|var| var.name.eq_ignore_ascii_case(name))
    }

    pub fn all_variable(&self, name: &str) -> Option<&UnrealVar> {
        self.all_variables
            .iter()
            .find(|var| var.name.eq_ignore_ascii_case(name))
    }

    /// Variables shown and editable in UnrealEd, inherited ones included.
    pub fn all_editor_vars(&self) -> impl Iterator<Item = &UnrealVar> {
        self.all_variables.iter().filter(|var| var.is_editable())
    }

    pub fn default_property(&self, name: &str) -> Option<&str> {
        self.all_default_properties.get(&name.to_lowercase())
    }

    /// `key=value` pairs of the first `#exec CATEGORY COMMAND ...` line.
    pub fn exec(&self, category: &str, command: &str) -> Option<KeyValues> {
        let tokens = self.preprocessor.iter().find(|tokens| {
            tokens.len() >= 3 && tokens[0] == "#exec" && tokens[1] == category && tokens[2] == command
        })?;

        Some(
            tokens[3..]
                .iter()
                .filter_map(|token| token.split_once('='))
                .map(|(key, value)| (key, value.trim_matches('"')))
                .collect(),
        )
    }
}
