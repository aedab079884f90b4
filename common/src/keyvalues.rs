use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// Insertion ordered key value list.
///
/// Duplicate keys are allowed through [`KeyValues::push`], which entity
/// connections rely on. Serialized as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues(pub Vec<(String, String)>);

impl KeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replaces the first value of `key` or appends a new pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    /// Appends without looking for an existing key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Removes every pair with `key`, returning the first removed value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(str::to_string);
        self.0.retain(|(k, _)| k != key);
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a KeyValues {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for KeyValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;

        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }

        map.end()
    }
}

struct KeyValuesVisitor;

impl<'de> Visitor<'de> for KeyValuesVisitor {
    type Value = KeyValues;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of string keys to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut res = KeyValues(Vec::with_capacity(access.size_hint().unwrap_or(0)));

        while let Some((k, v)) = access.next_entry::<String, String>()? {
            res.push(k, v);
        }

        Ok(res)
    }
}

impl<'de> Deserialize<'de> for KeyValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(KeyValuesVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_and_duplicates() {
        let mut kv = KeyValues::new();
        kv.insert("targetname", "door");
        kv.push("OnOpen", "a,Toggle,,0,-1");
        kv.push("OnOpen", "b,Toggle,,0,-1");
        kv.insert("targetname", "door2");

        assert_eq!(kv.len(), 3);
        assert_eq!(kv.get("targetname"), Some("door2"));
        assert_eq!(kv.get_ignore_case("ONOPEN"), Some("a,Toggle,,0,-1"));
        assert_eq!(kv.get_all("OnOpen").count(), 2);
        assert_eq!(kv.keys().collect::<Vec<_>>(), vec!["targetname", "OnOpen", "OnOpen"]);

        assert_eq!(kv.remove("OnOpen").as_deref(), Some("a,Toggle,,0,-1"));
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn json_keeps_order() {
        let kv: KeyValues = serde_json::from_str(r#"{"z": "1", "a": "2", "m": "3"}"#).unwrap();

        assert_eq!(kv.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(
            serde_json::to_string(&kv).unwrap(),
            r#"{"z":"1","a":"2","m":"3"}"#
        );
    }
}
