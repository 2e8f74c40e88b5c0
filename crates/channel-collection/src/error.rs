//! Error taxonomy for the channel collection.
//!
//! Variants are grouped by how a caller should react, not by where they
//! originate; [`Error::severity`] exposes that grouping so callers can
//! decide without matching on variant names or messages.

/// How a caller is expected to react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal to the container; the parent runtime should close it.
    DataCorruption,
    /// Fatal to processing the current operation; surfaced to the runtime.
    DataProcessing,
    /// Programmer error. Debug builds panic; production records and drops
    /// the offending operation.
    InternalConsistency,
    /// Returned to the caller; the container keeps running.
    Usage,
    /// A 404-shaped response; the container keeps running.
    NotFound,
    /// Swallowed with telemetry; never propagated.
    Transient,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("duplicate data store id `{0}` observed on remote attach")]
    DuplicateDataStore(String),

    #[error("malformed alias message: {0}")]
    MalformedAlias(String),

    #[error("no context for data store `{0}`")]
    NoContext(String),

    #[error("data store `{0}` has been deleted")]
    Deleted(String),

    #[error("data store or sub-path `{0}` not found")]
    NotFound(String),

    #[error("local attach ack for `{0}` without a matching pending-attach entry")]
    AttachAckWithoutPending(String),

    #[error("context `{0}` is in the Attaching state during {1}")]
    AttachingDuringCollection(String, &'static str),

    #[error("unknown container message type `{0}`")]
    UnknownMessageType(String),

    #[error("invalid object class for package path {0:?}")]
    Usage(Vec<String>),

    #[error("the channel collection has been disposed")]
    Disposed,

    #[error("downstream channel failed")]
    Channel(#[source] anyhow::Error),
}

impl Error {
    pub fn severity(&self) -> Severity {
        use Error::*;
        match self {
            DuplicateDataStore(_) | MalformedAlias(_) => Severity::DataCorruption,
            NoContext(_) | AttachingDuringCollection(..) => Severity::DataProcessing,
            AttachAckWithoutPending(_) | UnknownMessageType(_) => Severity::InternalConsistency,
            Usage(_) => Severity::Usage,
            NotFound(_) | Deleted(_) => Severity::NotFound,
            Disposed => Severity::Usage,
            Channel(_) => Severity::DataProcessing,
        }
    }

    /// Records or panics on an [`InternalConsistency`](Severity::InternalConsistency)
    /// violation depending on build profile, matching the §7 policy split.
    ///
    /// Returns the error so call sites can still short-circuit in release
    /// builds after it has been recorded.
    pub fn assert_consistency(self, panic_in_debug: bool) -> Self {
        debug_assert!(
            matches!(self.severity(), Severity::InternalConsistency) || !panic_in_debug,
            "not an InternalConsistency error: {self}"
        );
        if panic_in_debug && cfg!(debug_assertions) {
            panic!("internal consistency violation: {self}");
        }
        tracing::error!(error = %self, "internal consistency violation");
        self
    }
}
