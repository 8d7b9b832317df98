//! Attribute schemas exposed to the orchestrator.

use serde::Serialize;

/// Attribute value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    /// A JSON object carried as a string.
    JsonString,
}

/// How an attribute may change over the entity's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// Changing the value replaces the entity.
    ForceReplacement,
    /// The value can be overwritten in place.
    Updatable,
    /// Derived by the provider; never set by configuration.
    Computed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub mutability: Mutability,
    pub description: &'static str,
}

/// Schema of one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub type_name: &'static str,
    pub attributes: &'static [Attribute],
}

impl Schema {
    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of attributes whose change forces replacement.
    pub fn force_replacement(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|a| a.mutability == Mutability::ForceReplacement)
            .map(|a| a.name)
    }
}
