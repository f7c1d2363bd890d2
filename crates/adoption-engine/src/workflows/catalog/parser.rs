use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::io::Read;

use crate::workflows::adoption::domain::{Adoptable, AdoptableId};

pub(crate) fn parse_catalog<R: Read>(reader: R) -> Result<Vec<Adoptable>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut adoptables = Vec::new();

    for record in csv_reader.deserialize::<CatalogRow>() {
        adoptables.push(record?.into_adoptable());
    }

    Ok(adoptables)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    name: String,
    #[serde(rename = "type", default, deserialize_with = "split_list")]
    types: BTreeSet<String>,
    #[serde(default, deserialize_with = "split_list")]
    abilities: BTreeSet<String>,
    #[serde(default, deserialize_with = "flag")]
    adopted: bool,
    #[serde(default)]
    photo: String,
}

impl CatalogRow {
    fn into_adoptable(self) -> Adoptable {
        Adoptable {
            id: AdoptableId(self.id),
            name: self.name.to_ascii_lowercase(),
            types: self.types,
            abilities: self.abilities,
            adopted: self.adopted,
            photo_ref: self.photo,
        }
    }
}

/// `"fire; flying"` becomes `{"fire", "flying"}`.
fn split_list<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .split(';')
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect())
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "0" => Ok(false),
        "true" | "yes" | "1" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean adopted flag, found '{other}'"
        ))),
    }
}
