//! Routes requests to the driver of their container.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use super::cursor::{BatchCursor, Cursor};
use super::driver::Driver;
use super::memory::MemoryDriver;
use super::request::FetchRequest;
use super::sled_store::SledDriver;
use super::Document;
use crate::config::{ContainerName, DriverParams, EngineConfig};
use crate::error::Error;

/// One driver per container, created on first use and reused afterwards.
pub struct StorageManager {
    params: BTreeMap<String, DriverParams>,
    drivers: DashMap<String, Arc<dyn Driver>>,
}

impl StorageManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            params: config.drivers.clone(),
            drivers: DashMap::new(),
        }
    }

    /// Use `driver` for `container` instead of building one from parameters.
    pub fn register(&self, container: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(container.into(), driver);
    }

    /// Driver for a `<driver>.<name>` container.
    pub fn driver(&self, container: &str) -> Result<Arc<dyn Driver>, Error> {
        if let Some(driver) = self.drivers.get(container) {
            return Ok(driver.clone());
        }

        let driver = self.create_driver(container)?;
        Ok(self
            .drivers
            .entry(container.to_string())
            .or_insert(driver)
            .clone())
    }

    fn create_driver(&self, container: &str) -> Result<Arc<dyn Driver>, Error> {
        let parsed = ContainerName::parse(container)?;
        let params = self.params.get(container).ok_or_else(|| {
            Error::Config(format!("no driver parameters for container [{container}]"))
        })?;

        let driver: Arc<dyn Driver> = match parsed.driver {
            "memory" => match &params.path {
                Some(path) => Arc::new(MemoryDriver::load(path)?),
                None => Arc::new(MemoryDriver::new()),
            },
            "sled" => match (&params.path, params.temporary) {
                (_, true) => Arc::new(SledDriver::temporary()?),
                (Some(path), false) => Arc::new(SledDriver::open(path)?),
                (None, false) => {
                    return Err(Error::Config(format!(
                        "sled container [{container}] needs a path or temporary = true"
                    )))
                }
            },
            other => {
                return Err(Error::Config(format!(
                    "unknown driver [{other}] for container [{container}]"
                )))
            }
        };

        info!(container, driver = driver.name(), "created storage driver");
        Ok(driver)
    }

    fn driver_for(&self, request: &FetchRequest) -> Result<Arc<dyn Driver>, Error> {
        let container = request.metadata().container_name().ok_or_else(|| {
            Error::Config(format!(
                "no container configured for resource [{}]",
                request.resource_name()
            ))
        })?;
        self.driver(container)
    }

    pub fn fetch_one(&self, request: &FetchRequest) -> Result<Option<Document>, Error> {
        debug!(resource = request.resource_name(), filter = %request.filter(), "fetch one");
        self.driver_for(request)?.fetch_one(request)
    }

    pub fn prepare_fetch(&self, request: &FetchRequest) -> Result<Box<dyn Cursor>, Error> {
        debug!(resource = request.resource_name(), filter = %request.filter(), "prepare fetch");
        self.driver_for(request)?.prepare_fetch(request)
    }

    pub fn prepare_batch_fetch(
        &self,
        request: &FetchRequest,
        batch_size: usize,
    ) -> Result<BatchCursor, Error> {
        debug!(
            resource = request.resource_name(),
            filter = %request.filter(),
            batch_size,
            "prepare batch fetch"
        );
        self.driver_for(request)?
            .prepare_batch_fetch(request, batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityMetadata;

    #[test]
    fn test_driver_cached_per_container() {
        let config = EngineConfig::default()
            .with_driver("memory.crm", DriverParams::default())
            .with_driver("sled.crm", DriverParams::temporary());
        let storage = StorageManager::new(&config);

        let a = storage.driver("memory.crm").unwrap();
        let b = storage.driver("memory.crm").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(storage.driver("sled.crm").unwrap().name(), "sled");
    }

    #[test]
    fn test_driver_errors() {
        let config = EngineConfig::default()
            .with_driver("mongo.crm", DriverParams::default())
            .with_driver("sled.nopath", DriverParams::default());
        let storage = StorageManager::new(&config);

        for container in ["mongo.crm", "sled.nopath", "memory.unlisted", "nodot"] {
            assert!(
                matches!(storage.driver(container), Err(Error::Config(_))),
                "{container} should fail"
            );
        }
    }

    #[test]
    fn test_request_without_container() {
        let storage = StorageManager::new(&EngineConfig::default());
        let metadata = EntityMetadata::stub("Towns", "memory.x").with_container_name(None);
        let request = FetchRequest::new("Towns", Arc::new(metadata));
        assert!(matches!(storage.fetch_one(&request), Err(Error::Config(_))));
    }
}
