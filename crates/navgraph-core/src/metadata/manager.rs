//! Metadata resolver backed by the storage layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::entity::EntityMetadata;
use super::navigation::NavigationProperty;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::storage::{Condition, FetchRequest, StorageManager};

const CACHE_PREFIX_ENTITY: &str = "Entity.";
const CACHE_PREFIX_RESOURCE: &str = "Resource.";

/// Looks up entity metadata and navigation properties.
///
/// Everything resolved is cached for the lifetime of the manager; there is no
/// eviction or invalidation.
pub struct MetadataManager {
    storage: Arc<StorageManager>,
    /// Stub describing only where the metadata documents live.
    metadata_stub: Arc<EntityMetadata>,
    container_names: BTreeMap<String, String>,
    default_container: Option<String>,
    entities: DashMap<String, Arc<EntityMetadata>>,
    navigation: DashMap<(String, String), Arc<NavigationProperty>>,
}

impl MetadataManager {
    pub fn new(config: &EngineConfig, storage: Arc<StorageManager>) -> Self {
        let metadata_stub = EntityMetadata::stub(
            config.metadata.resource.clone(),
            config.metadata.container.clone(),
        );
        Self {
            storage,
            metadata_stub: Arc::new(metadata_stub),
            container_names: config.containers.clone(),
            default_container: config.default_container.clone(),
            entities: DashMap::new(),
            navigation: DashMap::new(),
        }
    }

    /// Metadata for an entity by short name.
    pub fn metadata_for_entity(&self, entity_name: &str) -> Result<Arc<EntityMetadata>, Error> {
        self.lookup(
            format!("{CACHE_PREFIX_ENTITY}{entity_name}"),
            "description.shortName",
            entity_name,
        )
        .and_then(|found| {
            found.ok_or_else(|| {
                Error::Metadata(format!("could not locate metadata for entity [{entity_name}]"))
            })
        })
    }

    /// Metadata for an entity by its default resource (collection) name.
    pub fn metadata_for_default_resource_name(
        &self,
        resource_name: &str,
    ) -> Result<Arc<EntityMetadata>, Error> {
        self.lookup(
            format!("{CACHE_PREFIX_RESOURCE}{resource_name}"),
            "description.defaultResourceName",
            resource_name,
        )
        .and_then(|found| {
            found.ok_or_else(|| {
                Error::Metadata(format!(
                    "could not locate metadata with default resource name [{resource_name}]"
                ))
            })
        })
    }

    /// Resolve the join keys of `entity_name.property_name`.
    pub fn navigation_property(
        &self,
        entity_name: &str,
        property_name: &str,
    ) -> Result<Arc<NavigationProperty>, Error> {
        let cache_key = (entity_name.to_string(), property_name.to_string());
        if let Some(found) = self.navigation.get(&cache_key) {
            return Ok(found.clone());
        }

        let entity = self.metadata_for_entity(entity_name)?;
        let raw = entity.navigation_definition(property_name).ok_or_else(|| {
            Error::Metadata(format!(
                "navigation property [{property_name}] does not exist on entity [{entity_name}]"
            ))
        })?;
        let related_entity = raw.related_entity_name().ok_or_else(|| {
            Error::Metadata(format!(
                "navigation property [{entity_name}.{property_name}] has no entityTypeName"
            ))
        })?;

        let resolved = if raw.is_scalar {
            let host_key = single_key(
                &raw.foreign_key_names,
                entity_name,
                property_name,
                "foreignKeyNames",
            )?;
            let related = self.metadata_for_entity(related_entity)?;
            let related_key = related.primary_key()?.ok_or_else(|| {
                Error::Metadata(format!(
                    "navigation property [{entity_name}.{property_name}]: related entity [{related_entity}] has no primary key"
                ))
            })?;
            NavigationProperty::scalar(property_name, host_key, related_entity, related_key)
        } else {
            let related_key = single_key(
                &raw.inv_foreign_key_names,
                entity_name,
                property_name,
                "invForeignKeyNames",
            )?;
            let host_key = entity.primary_key()?.ok_or_else(|| {
                Error::Metadata(format!(
                    "navigation property [{entity_name}.{property_name}]: entity [{entity_name}] has no primary key"
                ))
            })?;
            NavigationProperty::collection(property_name, host_key, related_entity, related_key)
        };

        debug!(entity = entity_name, navigation = %resolved, "resolved navigation property");
        let resolved = Arc::new(resolved);
        self.navigation.insert(cache_key, resolved.clone());
        Ok(resolved)
    }

    fn lookup(
        &self,
        cache_key: String,
        field: &str,
        value: &str,
    ) -> Result<Option<Arc<EntityMetadata>>, Error> {
        if let Some(found) = self.entities.get(&cache_key) {
            return Ok(Some(found.clone()));
        }

        debug!(%cache_key, "metadata cache miss");
        let mut request = FetchRequest::new(
            self.metadata_stub.default_resource_name(),
            self.metadata_stub.clone(),
        );
        request.add_condition(field, Condition::Eq(Value::String(value.to_string())))?;

        let Some(document) = self.storage.fetch_one(&request)? else {
            return Ok(None);
        };

        let metadata = EntityMetadata::from_document(Value::Object(document))?;
        let container = self
            .container_names
            .get(metadata.default_resource_name())
            .or(self.default_container.as_ref())
            .cloned();
        Ok(Some(self.cache(metadata.with_container_name(container))))
    }

    fn cache(&self, metadata: EntityMetadata) -> Arc<EntityMetadata> {
        let metadata = Arc::new(metadata);
        self.entities.insert(
            format!("{CACHE_PREFIX_ENTITY}{}", metadata.entity_name()),
            metadata.clone(),
        );
        self.entities.insert(
            format!("{CACHE_PREFIX_RESOURCE}{}", metadata.default_resource_name()),
            metadata.clone(),
        );
        metadata
    }
}

/// First and only key name of a navigation property. Compound keys fail.
fn single_key<'a>(
    names: &'a [String],
    entity_name: &str,
    property_name: &str,
    what: &str,
) -> Result<&'a str, Error> {
    match names {
        [name] => Ok(name.as_str()),
        [] => Err(Error::Metadata(format!(
            "illegal navigation property [{entity_name}.{property_name}]: {what} must be declared"
        ))),
        _ => Err(Error::Metadata(format!(
            "illegal navigation property [{entity_name}.{property_name}]: compound {what} [{}] are not supported",
            names.join(", ")
        ))),
    }
}
