use std::fmt;

use crate::errors::ValidationError;
use crate::Result;

/// A named group of configuration fields, scoped to one service.
///
/// The qualified form `<service>:<name>` is the identifier every backend
/// uses: the Redis hash key, the Consul KV prefix and the tag carried by
/// change notifications all derive from it. Names are case sensitive and
/// trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    service: String,
    name: String,
}

impl Namespace {
    /// Builds a namespace after canonicalizing and validating both parts.
    ///
    /// The service accepts `[A-Za-z0-9_-]`; the logical name additionally
    /// accepts `/` so hierarchical names survive the poll transport's tag
    /// grammar.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either part is empty after trimming
    /// or contains characters outside the accepted charset.
    pub fn new(
        service: &str,
        name: &str,
    ) -> Result<Self> {
        let service = service.trim();
        let name = name.trim();

        if service.is_empty() {
            return Err(ValidationError::EmptyService.into());
        }
        if !is_valid_segment(service) {
            return Err(ValidationError::InvalidService(service.to_string()).into());
        }
        if name.is_empty() {
            return Err(ValidationError::EmptyNamespace.into());
        }
        if !is_valid_name(name) {
            return Err(ValidationError::InvalidNamespace(name.to_string()).into());
        }

        Ok(Namespace {
            service: service.to_string(),
            name: name.to_string(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Logical name, without the service prefix. This is also the local
    /// cache key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote identifier in the `<service>:<name>` form.
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.service, self.name)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.name)
    }
}

/// One path segment: `[A-Za-z0-9_-]+`.
pub(crate) fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A logical name: one or more `/`-joined segments.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.split('/').all(is_valid_segment)
}
