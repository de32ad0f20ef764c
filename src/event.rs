use crate::identity::Identity;

/// Change notification taken off the wire after a peer's write.
///
/// Carries just enough to tell which namespace changed and who changed it;
/// the new field values always come from a follow-up bulk fetch. Transient:
/// constructed on receipt, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Service the changed namespace belongs to.
    pub service: String,
    /// Logical namespace name, without the service prefix.
    pub namespace: String,
    /// Identity of the process that performed the write.
    pub identity: Identity,
    /// Transport sequence marker: `None` for the push transport, the
    /// event's logical time for the poll transport.
    pub marker: Option<u64>,
}
