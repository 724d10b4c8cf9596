//! Engine configuration.
//!
//! Loaded from a JSON file. Containers are named `<driver>.<name>`, e.g.
//! `memory.crm` or `sled.crm`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default number of entities pulled per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default container holding entity metadata documents.
pub const DEFAULT_METADATA_CONTAINER: &str = "memory.metadata";

/// Default resource (collection) name of the metadata documents.
pub const DEFAULT_METADATA_RESOURCE: &str = "Entities";

/// Where entity metadata documents live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSource {
    pub container: String,
    pub resource: String,
}

impl Default for MetadataSource {
    fn default() -> Self {
        Self {
            container: DEFAULT_METADATA_CONTAINER.to_string(),
            resource: DEFAULT_METADATA_RESOURCE.to_string(),
        }
    }
}

/// Parameters handed to a driver when its container is first used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverParams {
    /// Data file (memory) or database directory (sled).
    pub path: Option<PathBuf>,
    /// Open a throwaway sled database instead of `path`.
    pub temporary: bool,
}

impl DriverParams {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            temporary: false,
        }
    }

    pub fn temporary() -> Self {
        Self {
            path: None,
            temporary: true,
        }
    }
}

/// Configuration shared by the CLI and the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub metadata: MetadataSource,
    /// Default resource name to container name.
    pub containers: BTreeMap<String, String>,
    /// Container used for resources not listed in `containers`.
    pub default_container: Option<String>,
    /// Container name to driver parameters.
    pub drivers: BTreeMap<String, DriverParams>,
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataSource::default(),
            containers: BTreeMap::new(),
            default_container: None,
            drivers: BTreeMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EngineConfig {
    /// Read and validate a JSON configuration file.
    ///
    /// Relative driver paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_json::from_str(&raw)?;

        if let Some(base) = path.parent() {
            for params in config.drivers.values_mut() {
                if let Some(p) = params.path.as_mut() {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        ContainerName::parse(&self.metadata.container)?;
        for name in self
            .containers
            .values()
            .chain(self.default_container.iter())
            .chain(self.drivers.keys())
        {
            ContainerName::parse(name)?;
        }
        Ok(())
    }

    /// Container for a default resource name, if one is configured.
    pub fn container_for(&self, resource: &str) -> Option<&str> {
        self.containers
            .get(resource)
            .or(self.default_container.as_ref())
            .map(String::as_str)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_metadata(mut self, container: impl Into<String>, resource: impl Into<String>) -> Self {
        self.metadata = MetadataSource {
            container: container.into(),
            resource: resource.into(),
        };
        self
    }

    pub fn with_container(mut self, resource: impl Into<String>, container: impl Into<String>) -> Self {
        self.containers.insert(resource.into(), container.into());
        self
    }

    pub fn with_default_container(mut self, container: impl Into<String>) -> Self {
        self.default_container = Some(container.into());
        self
    }

    pub fn with_driver(mut self, container: impl Into<String>, params: DriverParams) -> Self {
        self.drivers.insert(container.into(), params);
        self
    }
}

/// A `<driver>.<name>` container identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerName<'a> {
    pub driver: &'a str,
    pub name: &'a str,
}

impl<'a> ContainerName<'a> {
    pub fn parse(container: &'a str) -> Result<Self, Error> {
        match container.split_once('.') {
            Some((driver, name)) if !driver.is_empty() && !name.is_empty() => {
                Ok(Self { driver, name })
            }
            _ => Err(Error::Config(format!(
                "container name [{container}] must look like <driver>.<name>"
            ))),
        }
    }
}
