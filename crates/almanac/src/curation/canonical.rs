//! Canonical payloads and the keys that identify them across years.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::normalize;

/// The authoritative identity of a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCanonical {
    /// First name.
    pub name: String,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    /// Free-text qualifier distinguishing people who share a first name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguator: Option<String>,
    /// Aliases the person is referred to by.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alias: Vec<String>,
}

impl PersonCanonical {
    /// Canonical with only a first name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lastname: None,
            disambiguator: None,
            alias: Vec::new(),
        }
    }

    /// Set the last name.
    pub fn with_lastname(mut self, lastname: impl Into<String>) -> Self {
        self.lastname = Some(lastname.into());
        self
    }

    /// Set the disambiguator.
    pub fn with_disambiguator(mut self, disambiguator: impl Into<String>) -> Self {
        self.disambiguator = Some(disambiguator.into());
        self
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    /// Parse a curation file payload for the entry `key`.
    ///
    /// An object whose fields are all null (or absent) names the person after
    /// the entry's own key.
    pub fn from_payload(key: &str, payload: &Value) -> Result<Self, String> {
        let object = match payload {
            Value::Object(object) => object,
            Value::Null => return Err("canonical is null; people need a name".to_string()),
            other => {
                return Err(format!(
                    "canonical must be an object with a name, found {}",
                    json_type(other)
                ));
            }
        };

        let name = optional_string(object.get("name"), "name")?;
        let lastname = optional_string(object.get("lastname"), "lastname")?;
        let disambiguator = optional_string(object.get("disambiguator"), "disambiguator")?;
        let alias = string_list(object.get("alias"))?;

        match name {
            Some(name) => Ok(Self {
                name,
                lastname,
                disambiguator,
                alias,
            }),
            None if lastname.is_none() && disambiguator.is_none() && alias.is_empty() => {
                Ok(Self::named(key))
            }
            None => Err("canonical requires a name".to_string()),
        }
    }

    /// Accent- and case-insensitive identity key.
    ///
    /// `name|lastname`, else `name||disambiguator`, else `name|`.
    pub fn canonical_key(&self) -> String {
        person_key(
            &self.name,
            self.lastname.as_deref(),
            self.disambiguator.as_deref(),
        )
    }

    /// Whether the canonical carries a last name or disambiguator.
    pub fn is_disambiguated(&self) -> bool {
        self.lastname.is_some() || self.disambiguator.is_some()
    }

    /// Human-readable name: `Name Lastname`, `Name (disambiguator)` or `Name`.
    pub fn display_name(&self) -> String {
        match (&self.lastname, &self.disambiguator) {
            (Some(last), _) => format!("{} {}", self.name, last),
            (None, Some(d)) => format!("{} ({})", self.name, d),
            (None, None) => self.name.clone(),
        }
    }

    /// `name lastname` as a single normalized key.
    pub fn full_name_key(&self) -> String {
        match &self.lastname {
            Some(last) => normalize(&format!("{} {}", self.name, last)),
            None => normalize(&self.name),
        }
    }
}

/// Build a person key from its parts.
pub fn person_key(name: &str, lastname: Option<&str>, disambiguator: Option<&str>) -> String {
    let name = normalize(name);
    let lastname = lastname.map(normalize).filter(|l| !l.is_empty());
    let disambiguator = disambiguator.map(normalize).filter(|d| !d.is_empty());

    match (lastname, disambiguator) {
        (Some(last), _) => format!("{}|{}", name, last),
        (None, Some(d)) => format!("{}||{}", name, d),
        (None, None) => format!("{}|", name),
    }
}

/// Parse a location payload for the entry `key`: a string, or null for the key itself.
pub fn location_name_from_payload(key: &str, payload: &Value) -> Result<String, String> {
    match payload {
        Value::Null => Ok(key.to_string()),
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::String(_) => Err("canonical location name is empty".to_string()),
        other => Err(format!(
            "canonical location must be a string or null, found {}",
            json_type(other)
        )),
    }
}

/// Key of a location within its city.
pub fn location_key(city: &str, name: &str) -> String {
    format!("{}|{}", normalize(city), normalize(name))
}

fn optional_string(value: Option<&Value>, field: &str) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(format!("'{}' must be a string, found {}", field, json_type(other))),
    }
}

fn string_list(value: Option<&Value>) -> Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.trim().to_string()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(format!("'alias' entries must be strings, found {}", json_type(other))),
            })
            .collect(),
        Some(other) => Err(format!("'alias' must be a string or list, found {}", json_type(other))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
