//! The fixed allergen and nutrient schema.
//!
//! Both the prompt builder ([`crate::prompts`]) and the response shaper read
//! the key lists from here, so the set of keys the model is asked for and the
//! set of keys the API returns can never drift apart.
//!
//! ## Default-fill policy
//!
//! The model is free to omit keys or return odd types. [`SchemaPayload::from_value`]
//! always produces the complete schema:
//!
//! | Input                              | Allergen   | Nutrient            |
//! |------------------------------------|------------|---------------------|
//! | key missing / `null`               | `false`    | `None`              |
//! | boolean                            | as given   | `None`              |
//! | string                             | `false`    | trimmed, `""`→`None`|
//! | number                             | `false`    | number as string    |
//! | array / object                     | `false`    | `None`              |
//!
//! Keys outside the fixed sets are dropped.

use crate::error::ExtractError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// The ten allergens reported for every document, in response order.
pub const ALLERGENS: [&str; 10] = [
    "gluten",
    "egg",
    "crustaceans",
    "fish",
    "peanut",
    "soy",
    "milk",
    "tree_nuts",
    "celery",
    "mustard",
];

/// The six nutrients reported for every document, in response order.
pub const NUTRIENTS: [&str; 6] = [
    "energy",
    "fat",
    "carbohydrate",
    "sugar",
    "protein",
    "sodium",
];

/// Presence flag for each of the ten [`ALLERGENS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllergenMap {
    flags: [bool; ALLERGENS.len()],
}

impl AllergenMap {
    /// Flag for `name`, or `None` if `name` is not one of [`ALLERGENS`].
    pub fn get(&self, name: &str) -> Option<bool> {
        index_of(&ALLERGENS, name).map(|i| self.flags[i])
    }

    /// Set the flag for `name`. Returns `false` if `name` is unknown.
    pub fn set(&mut self, name: &str, present: bool) -> bool {
        match index_of(&ALLERGENS, name) {
            Some(i) => {
                self.flags[i] = present;
                true
            }
            None => false,
        }
    }

    /// `(name, flag)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        ALLERGENS.iter().copied().zip(self.flags.iter().copied())
    }

    /// Names of the allergens flagged as present.
    pub fn present(&self) -> Vec<&'static str> {
        self.iter().filter(|(_, p)| *p).map(|(n, _)| n).collect()
    }

    fn from_object(value: Option<&Value>) -> Self {
        let mut map = Self::default();
        if let Some(Value::Object(obj)) = value {
            for name in ALLERGENS {
                if let Some(Value::Bool(flag)) = obj.get(name) {
                    map.set(name, *flag);
                }
            }
        }
        map
    }
}

impl Serialize for AllergenMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ALLERGENS.len()))?;
        for (name, flag) in self.iter() {
            map.serialize_entry(name, &flag)?;
        }
        map.end()
    }
}

/// Optional value-with-unit for each of the six [`NUTRIENTS`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NutritionMap {
    values: [Option<String>; NUTRIENTS.len()],
}

impl NutritionMap {
    /// Value for `name`; `None` if unknown key or no value was found.
    pub fn get(&self, name: &str) -> Option<&str> {
        index_of(&NUTRIENTS, name).and_then(|i| self.values[i].as_deref())
    }

    /// Set the value for `name`. Returns `false` if `name` is unknown.
    pub fn set(&mut self, name: &str, value: Option<String>) -> bool {
        match index_of(&NUTRIENTS, name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        NUTRIENTS
            .iter()
            .copied()
            .zip(self.values.iter().map(|v| v.as_deref()))
    }

    fn from_object(value: Option<&Value>) -> Self {
        let mut map = Self::default();
        if let Some(Value::Object(obj)) = value {
            for name in NUTRIENTS {
                map.set(name, obj.get(name).and_then(nutrient_value));
            }
        }
        map
    }
}

impl Serialize for NutritionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUTRIENTS.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// The structured answer of the semantic stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SchemaPayload {
    pub allergens: AllergenMap,
    pub nutritional_values: NutritionMap,
}

impl SchemaPayload {
    /// Shape an arbitrary JSON value into the fixed schema.
    ///
    /// Only a non-object top level is an error; everything below it is
    /// default-filled.
    pub fn from_value(value: &Value) -> Result<Self, ExtractError> {
        let obj = value.as_object().ok_or_else(|| ExtractError::Parse {
            detail: format!("expected a JSON object, got {}", json_type(value)),
        })?;

        Ok(Self {
            allergens: AllergenMap::from_object(obj.get("allergens")),
            nutritional_values: NutritionMap::from_object(obj.get("nutritional_values")),
        })
    }
}

fn index_of(keys: &[&str], name: &str) -> Option<usize> {
    keys.iter().position(|k| *k == name)
}

fn nutrient_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
