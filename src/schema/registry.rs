use dashmap::DashMap;

use super::Schema;
use crate::errors::SchemaError;
use crate::fields::FieldMap;
use crate::fields::FieldValue;
use crate::Result;

/// Process-wide collection of declared schemas, keyed by namespace.
///
/// Concurrent declaration and assignment are safe; entries lock
/// independently.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    /// Register a schema, replacing any previous declaration of the same
    /// namespace.
    pub fn register(
        &self,
        schema: Schema,
    ) {
        self.schemas.insert(schema.namespace().to_string(), schema);
    }

    pub fn contains(
        &self,
        namespace: &str,
    ) -> bool {
        self.schemas.contains_key(namespace)
    }

    /// Registered namespaces, sorted for stable listings.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Assign a value through the registered schema of `namespace`.
    pub fn assign(
        &self,
        namespace: &str,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let mut schema = self
            .schemas
            .get_mut(namespace)
            .ok_or_else(|| SchemaError::UnknownNamespace(namespace.to_string()))?;
        schema.assign(field, value)
    }

    /// Current value of one field, assignment or default.
    pub fn value(
        &self,
        namespace: &str,
        field: &str,
    ) -> Result<FieldValue> {
        let entry = self
            .schemas
            .get(namespace)
            .ok_or_else(|| SchemaError::UnknownNamespace(namespace.to_string()))?;
        // The guard's own value() accessor shadows Schema::value.
        entry.value().value(field)
    }

    /// Render one namespace's defaults overlaid with assignments.
    pub fn to_field_map(
        &self,
        namespace: &str,
    ) -> Result<FieldMap> {
        let schema = self
            .schemas
            .get(namespace)
            .ok_or_else(|| SchemaError::UnknownNamespace(namespace.to_string()))?;
        Ok(schema.to_field_map())
    }
}
