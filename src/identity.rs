use std::fmt;

use rand::Rng;

/// Unique identity of one running client instance.
///
/// Every client generates a fresh identity at construction and attaches it
/// to each change notification it publishes. The watch loop compares the
/// identity carried by an incoming notification against its own to drop
/// echoes of local writes. Never used for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Generates a random 128-bit identity, rendered as 32 lowercase hex
    /// digits.
    pub fn generate() -> Self {
        let raw: u128 = rand::thread_rng().gen();
        Identity(format!("{:032x}", raw))
    }

    /// Wraps an identity received over the wire.
    pub fn from_wire(raw: impl Into<String>) -> Self {
        Identity(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
