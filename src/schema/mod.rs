//! Declared namespace schemas: field kinds, defaults and descriptions.
//!
//! A schema is local metadata. Declaring one creates nothing in the
//! backend and the client never consults it; services wanting typed
//! guarantees assign through the schema, then hand the rendered field
//! map to the client.

mod registry;

#[cfg(test)]
mod schema_test;

pub use registry::*;

use std::collections::HashMap;

use crate::errors::SchemaError;
use crate::fields::FieldKind;
use crate::fields::FieldMap;
use crate::fields::FieldValue;
use crate::Result;

/// Declaration of one field: kind, default and human description.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    default: FieldValue,
    description: String,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn default(&self) -> &FieldValue {
        &self.default
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Declared shape of one namespace plus its current assignments.
#[derive(Debug, Clone)]
pub struct Schema {
    namespace: String,
    specs: HashMap<String, FieldSpec>,
    values: HashMap<String, FieldValue>,
}

impl Schema {
    pub fn builder(namespace: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            namespace: namespace.into(),
            specs: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn spec(
        &self,
        field: &str,
    ) -> Option<&FieldSpec> {
        self.specs.get(field)
    }

    /// Assign a value to a declared field.
    ///
    /// # Errors
    /// Unknown fields are rejected, as are values whose kind differs from
    /// the declared one.
    pub fn assign(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let value = value.into();
        let spec = self
            .specs
            .get(field)
            .ok_or_else(|| SchemaError::UnknownField {
                namespace: self.namespace.clone(),
                field: field.to_string(),
            })?;

        if value.kind() != spec.kind {
            return Err(SchemaError::TypeMismatch {
                field: field.to_string(),
                expected: spec.kind.to_string(),
                actual: value.kind().to_string(),
            }
            .into());
        }

        self.values.insert(field.to_string(), value);
        Ok(())
    }

    /// Current value of a field: the assignment when set, the declared
    /// default otherwise.
    pub fn value(
        &self,
        field: &str,
    ) -> Result<FieldValue> {
        if let Some(value) = self.values.get(field) {
            return Ok(value.clone());
        }
        match self.specs.get(field) {
            Some(spec) => Ok(spec.default.clone()),
            None => Err(SchemaError::UnknownField {
                namespace: self.namespace.clone(),
                field: field.to_string(),
            }
            .into()),
        }
    }

    /// Render defaults overlaid with assignments, ready for a global
    /// write.
    pub fn to_field_map(&self) -> FieldMap {
        let mut map: FieldMap = self
            .specs
            .values()
            .map(|spec| (spec.name.clone(), spec.default.clone()))
            .collect();
        for (field, value) in &self.values {
            map.insert(field.clone(), value.clone());
        }
        map
    }
}

/// Collects field declarations for one namespace.
pub struct SchemaBuilder {
    namespace: String,
    specs: HashMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Declare a field. The kind is derived from the default value.
    pub fn field(
        mut self,
        name: &str,
        default: impl Into<FieldValue>,
        description: &str,
    ) -> Self {
        let default = default.into();
        let spec = FieldSpec {
            name: name.to_string(),
            kind: default.kind(),
            default,
            description: description.to_string(),
        };
        self.specs.insert(name.to_string(), spec);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            namespace: self.namespace,
            specs: self.specs,
            values: HashMap::new(),
        }
    }
}
