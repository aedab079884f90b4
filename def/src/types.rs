use common::KeyValues;
use serde::Serialize;

pub const INHERIT: &str = "inherit";

/// A key of an entityDef, with the editor directive describing it if any.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DefProperty {
    /// Lowercase.
    pub key: String,
    /// `None` when only an editor directive names the key.
    pub value: Option<String>,
    /// Such as `editor_var` or `editor_model`.
    pub editor_tag: Option<String>,
    pub editor_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EntityDef {
    /// As written in the file.
    pub name: String,
    pub properties: Vec<DefProperty>,
    /// Directives without a key, such as `"editor_color" "1 .5 0"`.
    pub editor_tags: KeyValues,
    /// Ancestors, nearest first.
    pub inheritance_chain: Vec<String>,
    pub all_properties: Vec<DefProperty>,
}

impl EntityDef {
    pub fn property(&self, key: &str) -> Option<&DefProperty> {
        self.properties
            .iter()
            .find(|property| property.key.eq_ignore_ascii_case(key))
    }

    pub fn all_property(&self, key: &str) -> Option<&DefProperty> {
        self.all_properties
            .iter()
            .find(|property| property.key.eq_ignore_ascii_case(key))
    }

    pub(crate) fn property_mut(&mut self, key: &str) -> &mut DefProperty {
        let index = match self.properties.iter().position(|p| p.key == key) {
            Some(index) => index,
            None => {
                self.properties.push(DefProperty {
                    key: key.to_string(),
                    ..Default::default()
                });

                self.properties.len() - 1
            }
        };

        &mut self.properties[index]
    }

    /// Parent named by the `inherit` key.
    pub fn inherit(&self) -> Option<&str> {
        self.property(INHERIT)?.value.as_deref()
    }

    pub fn keyvalues(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().filter_map(keyvalue)
    }

    pub fn all_keyvalues(&self) -> impl Iterator<Item = (&str, &str)> {
        self.all_properties.iter().filter_map(keyvalue)
    }

    pub fn editor_properties(&self) -> impl Iterator<Item = &DefProperty> {
        self.properties
            .iter()
            .filter(|property| property.editor_tag.is_some())
    }

    pub fn all_editor_properties(&self) -> impl Iterator<Item = &DefProperty> {
        self.all_properties
            .iter()
            .filter(|property| property.editor_tag.is_some())
    }
}

fn keyvalue(property: &DefProperty) -> Option<(&str, &str)> {
    property
        .value
        .as_deref()
        .map(|value| (property.key.as_str(), value))
}
