//! Entity catalog: lookup of descriptors by entity identifier.

use super::entity::EntityDescriptor;
use crate::error::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Descriptors keyed by entity identifier, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Vec<EntityDescriptor>,
    by_name: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    entities: Vec<EntityDescriptor>,
}

impl EntityCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from descriptors. Later duplicates replace earlier ones.
    pub fn from_entities(entities: impl IntoIterator<Item = EntityDescriptor>) -> Self {
        let mut catalog = Self::new();
        for entity in entities {
            catalog.insert(entity);
        }
        catalog
    }

    /// Parse a catalog from a JSON document of the form `{"entities": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::from_entities(file.entities))
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Insert or replace a descriptor.
    pub fn insert(&mut self, entity: EntityDescriptor) {
        match self.by_name.get(&entity.name) {
            Some(&idx) => self.entities[idx] = entity,
            None => {
                self.by_name.insert(entity.name.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    /// Get a descriptor by entity identifier.
    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.by_name.get(name).map(|&idx| &self.entities[idx])
    }

    /// All descriptors in declaration order.
    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    /// Descriptors for the given identifiers, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Vec<EntityDescriptor>, Error> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownEntity(name.clone()))
            })
            .collect()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
