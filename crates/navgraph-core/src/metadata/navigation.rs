//! Resolved navigation properties.

use std::fmt;

/// One edge of the entity graph, resolved to its join keys.
///
/// For a scalar (1:1) relation `host_key` is the foreign key on the host and
/// `related_key` the related entity's primary key. For a collection (1:many)
/// relation `host_key` is the host's primary key and `related_key` the inverse
/// foreign key on the many side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationProperty {
    pub name: String,
    pub is_scalar: bool,
    pub host_key: String,
    pub related_key: String,
    /// Related entity short name, namespace stripped.
    pub related_entity: String,
}

impl NavigationProperty {
    pub fn scalar(
        name: impl Into<String>,
        host_key: impl Into<String>,
        related_entity: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            is_scalar: true,
            host_key: host_key.into(),
            related_key: related_key.into(),
            related_entity: related_entity.into(),
        }
    }

    pub fn collection(
        name: impl Into<String>,
        host_key: impl Into<String>,
        related_entity: impl Into<String>,
        related_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            is_scalar: false,
            host_key: host_key.into(),
            related_key: related_key.into(),
            related_entity: related_entity.into(),
        }
    }
}

impl fmt::Display for NavigationProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {}.{}, {})",
            self.name,
            self.host_key,
            self.related_entity,
            self.related_key,
            if self.is_scalar { "1:1" } else { "1:many" }
        )
    }
}
