//! Wire-shaped message types (§3, §6).
//!
//! These mirror the JSON shapes a container actually puts on the wire; the
//! naming here is generic rather than tied to any one host framework (the
//! distilled spec's `FluidDataStoreOp` becomes [`DataStoreOp`], and its
//! serialized-handle tag `__fluid_handle__` becomes [`HANDLE_TYPE_TAG`]).

use serde::{Deserialize, Serialize};

/// The tag a serialized handle carries in op payloads, detected by
/// [`crate::router::detect_outbound_references`].
pub const HANDLE_TYPE_TAG: &str = "__handle__";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub store_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    pub entries: Vec<SnapshotEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEntry {
    /// Path of this entry relative to the store root.
    pub path: String,
    pub content: serde_json::Value,
    /// Outbound routes discovered in this entry's GC payload at attach time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outbound_routes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AliasMessage {
    pub internal_id: String,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpContents {
    #[serde(rename = "type")]
    pub op_type: String,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub address: String,
    pub contents: OpContents,
}

/// The three kinds of message this subsystem's `OpRouter` dispatches on
/// (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum ContainerMessage {
    Attach(AttachMessage),
    Alias(AliasMessage),
    DataStoreOp(Envelope),
}
