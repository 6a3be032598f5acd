// Entity type registry: maps an entity group name, known only at runtime, to
// the shape its results are decoded into.

use crate::entity::Shape;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown entity group: {0}")]
    UnknownGroup(String),
}

/// Groups installed by [`EntityTypeRegistry::builtin`].
pub const BUILTIN_GROUPS: [(&str, Shape); 6] = [
    ("host", Shape::Host),
    ("hostgroup", Shape::HostGroup),
    ("hostinterface", Shape::HostInterface),
    ("history", Shape::History),
    ("graph", Shape::Graph),
    ("user", Shape::User),
];

/// Runtime dictionary from group name to result shape.
///
/// Read-mostly: registration normally happens once at startup, after which
/// any number of callers may resolve concurrently.
#[derive(Debug)]
pub struct EntityTypeRegistry {
    shapes: RwLock<HashMap<String, Shape>>,
}

impl EntityTypeRegistry {
    /// An empty registry. Every lookup fails until groups are registered.
    pub fn new() -> Self {
        Self {
            shapes: RwLock::new(HashMap::new()),
        }
    }

    /// A registry populated with the six built-in groups.
    pub fn builtin() -> Self {
        let registry = Self::new();
        for (group, shape) in BUILTIN_GROUPS {
            registry.register(group, shape);
        }
        registry
    }

    /// Installs or overwrites the shape for `group`, returning the previous one.
    pub fn register(&self, group: impl Into<String>, shape: Shape) -> Option<Shape> {
        let group = group.into();
        debug!(group = %group, shape = %shape, "registering entity group");
        self.shapes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(group, shape)
    }

    pub fn resolve(&self, group: &str) -> Result<Shape, RegistryError> {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .copied()
            .ok_or_else(|| RegistryError::UnknownGroup(group.to_string()))
    }

    pub fn contains(&self, group: &str) -> bool {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(group)
    }

    /// Registered group names, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        groups.sort();
        groups
    }
}

impl Default for EntityTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
