use itertools::Itertools;
use serde::ser::{Serialize, SerializeMap, Serializer};
use url::form_urlencoded;


// Successful controls of a submitted form, in document order. Names may repeat (e.g. a
// multi-select), so this is a list rather than a map.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct FormFields {
    fields: Vec<(String, String)>,
}

impl FormFields {
    pub fn new() -> Self { Self::default() }

    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        FormFields {
            fields: pairs.into_iter().map(|(name, value)| (name.into(), value.into())).collect(),
        }
    }

    // Parses `name=value&name=value` with the usual form encoding (`+` for space,
    // percent-escapes). Pairs without `=` get an empty value.
    pub fn parse_urlencoded(input: &str) -> Self {
        FormFields {
            fields: form_urlencoded::parse(input.trim().as_bytes()).into_owned().collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    // Body of the fallback POST. Keeps every pair, repeated names included.
    pub fn to_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new()).extend_pairs(self.iter()).finish()
    }

    // One value per name: a repeated name keeps the position of its first occurrence and the
    // value of its last one.
    pub fn flattened(&self) -> Vec<(&str, &str)> {
        let names = self.fields.iter().map(|(name, _)| name.as_str()).unique();
        names
            .filter_map(|name| {
                let (_, value) = self.fields.iter().rev().find(|(n, _)| n == name)?;
                Some((name, value.as_str()))
            })
            .collect()
    }
}

impl Serialize for FormFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flattened = self.flattened();
        let mut map = serializer.serialize_map(Some(flattened.len()))?;
        for (name, value) in flattened {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
