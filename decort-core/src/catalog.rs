//! Catalog of managed resources and data sources
//!
//! The host asks the provider for its resource and data-source types once at
//! process initialization; the catalog is the immutable answer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::lifecycle::{ManagedDataSource, ManagedResource};

/// Immutable registry of resource and data-source implementations.
#[derive(Default, Clone)]
pub struct Catalog {
    resources: BTreeMap<&'static str, Arc<dyn ManagedResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn ManagedDataSource>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource: Arc<dyn ManagedResource>) -> Self {
        self.resources.insert(resource.type_name(), resource);
        self
    }

    pub fn with_data_source(mut self, data_source: Arc<dyn ManagedDataSource>) -> Self {
        self.data_sources.insert(data_source.type_name(), data_source);
        self
    }

    pub fn resource(&self, type_name: &str) -> Option<&Arc<dyn ManagedResource>> {
        self.resources.get(type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&Arc<dyn ManagedDataSource>> {
        self.data_sources.get(type_name)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.data_sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.data_sources.is_empty()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
