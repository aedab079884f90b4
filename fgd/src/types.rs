use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClassType {
    BaseClass,
    PointClass,
    NpcClass,
    SolidClass,
    KeyFrameClass,
    MoveClass,
    FilterClass,
}

impl ClassType {
    const ALL: [Self; 7] = [
        Self::BaseClass,
        Self::PointClass,
        Self::NpcClass,
        Self::SolidClass,
        Self::KeyFrameClass,
        Self::MoveClass,
        Self::FilterClass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseClass => "@BaseClass",
            Self::PointClass => "@PointClass",
            Self::NpcClass => "@NPCClass",
            Self::SolidClass => "@SolidClass",
            Self::KeyFrameClass => "@KeyFrameClass",
            Self::MoveClass => "@MoveClass",
            Self::FilterClass => "@FilterClass",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class_type| class_type.as_str().eq_ignore_ascii_case(token))
    }
}

/// Header component such as `base(Targetname, Angles)` or `studio("models/a.mdl")`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    /// Lowercase.
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flag {
    pub bit: u32,
    pub description: String,
    pub default: bool,
}

impl Flag {
    /// Index of the highest set bit.
    pub fn bit_index(&self) -> Option<u32> {
        (self.bit != 0).then(|| 31 - self.bit.leading_zeros())
    }
}

/// Mask of every flag that is on by default.
pub fn flags_default_value(flags: &[Flag]) -> u32 {
    flags
        .iter()
        .filter(|flag| flag.default)
        .filter_map(Flag::bit_index)
        .fold(0, |mask, index| mask | (1 << index))
}

/// Descriptions by bit index, one slot for each of the 32 bits.
pub fn flags_descriptions(flags: &[Flag]) -> Vec<String> {
    let mut res = vec![String::new(); 32];

    for flag in flags {
        if let Some(index) = flag.bit_index() {
            res[index as usize] = flag.description.clone();
        }
    }

    res
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum PropertyKind {
    /// Any type other than choices and flags, lowercase. Not validated.
    Builtin(String),
    Choices(Vec<Choice>),
    Flags(Vec<Flag>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    None,
    Text(String),
    ChoiceIndex(usize),
    FlagsMask(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    /// Default as written in the file.
    pub raw_default: Option<String>,
    pub default: DefaultValue,
}

impl Property {
    pub fn type_name(&self) -> &str {
        match &self.kind {
            PropertyKind::Builtin(name) => name,
            PropertyKind::Choices(_) => "choices",
            PropertyKind::Flags(_) => "flags",
        }
    }

    pub fn choices(&self) -> Option<&[Choice]> {
        match &self.kind {
            PropertyKind::Choices(choices) => Some(choices),
            _ => None,
        }
    }

    pub fn flags(&self) -> Option<&[Flag]> {
        match &self.kind {
            PropertyKind::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    /// Default as the text an editor would store in the key.
    pub fn default_value_text(&self) -> Option<String> {
        match &self.default {
            DefaultValue::None => None,
            DefaultValue::Text(text) => Some(text.clone()),
            DefaultValue::ChoiceIndex(index) => self
                .choices()
                .and_then(|choices| choices.get(*index))
                .map(|choice| choice.value.clone()),
            DefaultValue::FlagsMask(mask) => Some(mask.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IoKind {
    Input,
    Output,
}

impl IoKind {
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("input") {
            Some(Self::Input)
        } else if token.eq_ignore_ascii_case("output") {
            Some(Self::Output)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputOutput {
    pub kind: IoKind,
    pub name: String,
    /// Lowercase.
    pub argument_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityClass {
    pub class_type: ClassType,
    /// Lowercase.
    pub classname: String,
    pub description: String,
    pub components: Vec<Component>,
    /// Own properties in file order.
    pub properties: Vec<Property>,
    pub io: Vec<InputOutput>,
    /// `base(...)` arguments, lowercase.
    pub parents: Vec<String>,
    /// Self first, then ancestors breadth first.
    pub class_hierarchy: Vec<String>,
    /// Ancestors breadth first, nearest first.
    pub inheritance_chain: Vec<String>,
    pub all_properties: Vec<Property>,
    pub all_io: Vec<InputOutput>,
}

fn find_property<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties
        .iter()
        .find(|property| property.name.eq_ignore_ascii_case(name))
}

impl EntityClass {
    pub fn property(&self, name: &str) -> Option<&Property> {
        find_property(&self.properties, name)
    }

    /// Property of this class or the nearest ancestor defining it.
    pub fn all_property(&self, name: &str) -> Option<&Property> {
        find_property(&self.all_properties, name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &InputOutput> {
        self.all_io.iter().filter(|io| io.kind == IoKind::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &InputOutput> {
        self.all_io.iter().filter(|io| io.kind == IoKind::Output)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.name == name)
    }

    pub fn is_placeable(&self) -> bool {
        self.class_type != ClassType::BaseClass
    }

    fn studio_component(&self) -> Option<&Component> {
        self.component("studio")
            .or_else(|| self.component("studioprop"))
    }

    pub fn has_model(&self) -> bool {
        self.all_property("model").is_some() || self.studio_component().is_some()
    }

    /// Model from the `model` property default, else from the `studio()` argument.
    pub fn default_model(&self) -> Option<String> {
        if let Some(property) = self.all_property("model") {
            let model = match &property.kind {
                PropertyKind::Builtin(name) if name == "studio" => property.default_value_text(),
                PropertyKind::Choices(_) => property.default_value_text(),
                _ => None,
            };

            if model.is_some() {
                return model;
            }
        }

        self.studio_component()
            .and_then(|component| component.args.first())
            .cloned()
    }
}
