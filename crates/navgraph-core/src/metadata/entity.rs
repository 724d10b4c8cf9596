//! Entity metadata parsed from Breeze-style metadata documents.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Declared data type of a field, grouped by how literals are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Float,
    Boolean,
    String,
    DateTime,
}

impl DataType {
    /// Map a metadata `dataType` name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int16" | "Int32" | "Int64" | "Byte" => Some(DataType::Integer),
            "Single" | "Double" | "Decimal" => Some(DataType::Float),
            "Boolean" => Some(DataType::Boolean),
            "String" | "Guid" => Some(DataType::String),
            "DateTime" | "DateTimeOffset" => Some(DataType::DateTime),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    description: EntityDescription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityDescription {
    short_name: String,
    default_resource_name: String,
    #[serde(default)]
    key: Option<RawKey>,
    #[serde(default)]
    data_properties: Option<Vec<DataProperty>>,
    #[serde(default)]
    navigation_properties: Vec<NavigationDefinition>,
}

#[derive(Debug, Deserialize)]
struct RawKey {
    #[serde(rename = "propertyRef")]
    property_ref: PropertyRefs,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PropertyRefs {
    One(PropertyRef),
    Many(Vec<PropertyRef>),
}

#[derive(Debug, Deserialize)]
struct PropertyRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataProperty {
    name: String,
    #[serde(default)]
    data_type: Option<String>,
}

/// Raw navigation property definition as declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDefinition {
    pub name: String,
    #[serde(default)]
    pub entity_type_name: Option<String>,
    #[serde(default)]
    pub is_scalar: bool,
    #[serde(default)]
    pub foreign_key_names: Vec<String>,
    #[serde(default)]
    pub inv_foreign_key_names: Vec<String>,
}

impl NavigationDefinition {
    /// Related entity name with any `:#Namespace` suffix removed.
    pub fn related_entity_name(&self) -> Option<&str> {
        self.entity_type_name
            .as_deref()
            .map(|name| name.split_once(":#").map_or(name, |(short, _)| short))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyDefinition {
    Undeclared,
    Single(String),
    Compound(Vec<String>),
}

/// Description of one entity type.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    short_name: String,
    default_resource_name: String,
    container_name: Option<String>,
    key: KeyDefinition,
    /// `None` when the document declares no data properties at all.
    data_types: Option<HashMap<String, Option<String>>>,
    navigation: Vec<NavigationDefinition>,
}

impl EntityMetadata {
    /// Parse a metadata document of the form `{"description": {...}}`.
    pub fn from_document(document: Value) -> Result<Self, Error> {
        let doc: MetadataDocument = serde_json::from_value(document)
            .map_err(|e| Error::Metadata(format!("malformed metadata document: {e}")))?;
        let desc = doc.description;

        let key = match desc.key.map(|k| k.property_ref) {
            None => KeyDefinition::Undeclared,
            Some(PropertyRefs::One(r)) => KeyDefinition::Single(r.name),
            Some(PropertyRefs::Many(mut refs)) if refs.len() == 1 => {
                KeyDefinition::Single(refs.remove(0).name)
            }
            Some(PropertyRefs::Many(refs)) if refs.is_empty() => KeyDefinition::Undeclared,
            Some(PropertyRefs::Many(refs)) => {
                KeyDefinition::Compound(refs.into_iter().map(|r| r.name).collect())
            }
        };

        let data_types = desc.data_properties.map(|props| {
            props
                .into_iter()
                .map(|p| (p.name, p.data_type))
                .collect::<HashMap<_, _>>()
        });

        Ok(Self {
            short_name: desc.short_name,
            default_resource_name: desc.default_resource_name,
            container_name: None,
            key,
            data_types,
            navigation: desc.navigation_properties,
        })
    }

    /// Minimal metadata that only knows where it is stored. Used to fetch the
    /// metadata documents themselves.
    pub fn stub(resource_name: impl Into<String>, container_name: impl Into<String>) -> Self {
        let resource_name = resource_name.into();
        Self {
            short_name: resource_name.clone(),
            default_resource_name: resource_name,
            container_name: Some(container_name.into()),
            key: KeyDefinition::Undeclared,
            data_types: None,
            navigation: Vec::new(),
        }
    }

    pub fn with_container_name(mut self, container_name: Option<String>) -> Self {
        self.container_name = container_name;
        self
    }

    pub fn entity_name(&self) -> &str {
        &self.short_name
    }

    pub fn default_resource_name(&self) -> &str {
        &self.default_resource_name
    }

    pub fn container_name(&self) -> Option<&str> {
        self.container_name.as_deref()
    }

    /// The single primary key field, if declared. Compound keys are rejected.
    pub fn primary_key(&self) -> Result<Option<&str>, Error> {
        match &self.key {
            KeyDefinition::Undeclared => Ok(None),
            KeyDefinition::Single(name) => Ok(Some(name.as_str())),
            KeyDefinition::Compound(names) => Err(Error::Metadata(format!(
                "entity [{}] declares a compound key [{}], which is not supported",
                self.short_name,
                names.join(", ")
            ))),
        }
    }

    /// Declared `dataType` name of a field.
    pub fn data_type_name(&self, field: &str) -> Result<&str, Error> {
        let types = self.data_types.as_ref().ok_or_else(|| {
            Error::Metadata(format!(
                "could not find property [{field}] for entity [{}]: no data properties declared",
                self.short_name
            ))
        })?;
        match types.get(field) {
            Some(Some(name)) => Ok(name.as_str()),
            Some(None) => Err(Error::Metadata(format!(
                "could not find data type for property [{field}] on entity [{}]",
                self.short_name
            ))),
            None => Err(Error::Metadata(format!(
                "could not find property [{field}] for entity [{}]",
                self.short_name
            ))),
        }
    }

    pub fn navigation_definition(&self, name: &str) -> Option<&NavigationDefinition> {
        self.navigation.iter().find(|n| n.name == name)
    }

    pub fn navigation_definitions(&self) -> &[NavigationDefinition] {
        &self.navigation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn county() -> Value {
        json!({
            "description": {
                "shortName": "LookupCounty",
                "defaultResourceName": "LookupCountys",
                "key": {"propertyRef": {"name": "LookupCountyID"}},
                "dataProperties": [
                    {"name": "LookupCountyID", "dataType": "Int32"},
                    {"name": "County", "dataType": "String"},
                    {"name": "Notes"}
                ],
                "navigationProperties": [{
                    "name": "LookupNations",
                    "entityTypeName": "LookupNation:#Crm.Models",
                    "isScalar": true,
                    "foreignKeyNames": ["LookupNationID"]
                }]
            }
        })
    }

    #[test]
    fn test_from_document() {
        let meta = EntityMetadata::from_document(county()).unwrap();
        assert_eq!(meta.entity_name(), "LookupCounty");
        assert_eq!(meta.default_resource_name(), "LookupCountys");
        assert_eq!(meta.primary_key().unwrap(), Some("LookupCountyID"));
        assert_eq!(meta.data_type_name("County").unwrap(), "String");
        assert!(meta.container_name().is_none());

        let nav = meta.navigation_definition("LookupNations").unwrap();
        assert!(nav.is_scalar);
        assert_eq!(nav.related_entity_name(), Some("LookupNation"));
    }

    #[test]
    fn test_missing_property_and_type() {
        let meta = EntityMetadata::from_document(county()).unwrap();
        assert!(matches!(meta.data_type_name("Nope"), Err(Error::Metadata(_))));
        assert!(matches!(meta.data_type_name("Notes"), Err(Error::Metadata(_))));
    }

    #[test]
    fn test_compound_key_rejected() {
        let meta = EntityMetadata::from_document(json!({
            "description": {
                "shortName": "Pair",
                "defaultResourceName": "Pairs",
                "key": {"propertyRef": [{"name": "A"}, {"name": "B"}]}
            }
        }))
        .unwrap();
        assert!(matches!(meta.primary_key(), Err(Error::Metadata(_))));
    }

    #[test]
    fn test_missing_description() {
        let err = EntityMetadata::from_document(json!({"shortName": "X"})).unwrap_err();
        assert!(matches!(err, Error::Metadata(_)));
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::from_name("Int32"), Some(DataType::Integer));
        assert_eq!(DataType::from_name("DateTime"), Some(DataType::DateTime));
        assert_eq!(DataType::from_name("Binary"), None);
    }
}
