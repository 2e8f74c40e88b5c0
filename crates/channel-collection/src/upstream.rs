//! The parent runtime's interface, consumed only (§6 "Upstream").

use crate::error::Error;
use crate::id::GeneratedId;
use crate::wire::ContainerMessage;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Detached,
    Attaching,
    Attached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Changed,
    Loaded,
}

/// The container runtime this subsystem is embedded in. Out of scope per
/// §1: clock, op submission plumbing, id generation, connection state are
/// all the caller's concern; this trait is just the seam.
#[async_trait]
pub trait UpstreamRuntime: Send + Sync {
    fn submit_message(&self, message: ContainerMessage, local_meta: Option<serde_json::Value>);

    fn submit_signal(&self, address: &str, signal: serde_json::Value, target_client: Option<&str>);

    async fn fetch_blob(&self, id: &str) -> anyhow::Result<Vec<u8>>;

    fn attach_state(&self) -> AttachState;

    fn generate_document_unique_id(&self) -> GeneratedId;

    fn added_outbound_reference(&self, from_handle: &str, to_handle: &str);

    /// May fail if `path` names a tombstoned node and policy forbids its use
    /// (§4.J).
    fn node_updated(
        &self,
        path: &str,
        kind: ChangeKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), Error>;

    fn create_child_summarizer_node(&self, id: &str);

    fn delete_child_summarizer_node(&self, id: &str);
}
