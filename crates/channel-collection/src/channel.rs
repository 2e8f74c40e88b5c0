//! The downstream data-store channel contract (§6).
//!
//! Concrete channel implementations (the shared-object DDSes) are explicitly
//! out of scope (§1); this module only defines the capabilities the
//! collection requires of them, and the registry used to construct them.

use crate::error::Error;
use crate::wire::Snapshot;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct GcDataNode {
    /// Path of this node relative to the owning store's root (empty string
    /// for the store's own root node).
    pub id: String,
    pub outbound_routes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GcData {
    pub nodes: Vec<GcDataNode>,
}

/// What a store contributes to an attach summary (§4.H).
#[derive(Debug, Clone)]
pub struct AttachSummary {
    pub snapshot: Snapshot,
    /// Ids of other stores this call transitively made reachable (e.g. by
    /// touching a handle during serialization), which the summary builder's
    /// fixed-point loop must also bind and summarize.
    pub bound_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub headers: crate::request::RequestHeaders,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub value: Value,
}

/// Capabilities the collection requires of a loaded data-store channel
/// (§6 "Downstream").
#[async_trait]
pub trait DataStoreChannel: Send + Sync {
    /// Idempotent materialization; called at most once per context (the
    /// context enforces this, not the channel).
    async fn realize(&mut self) -> anyhow::Result<()>;

    fn process(&mut self, op: &crate::wire::OpContents, local: bool);

    fn process_signal(&mut self, signal: Value, local: bool);

    fn get_gc_data(&self, full_gc: bool) -> GcData;

    fn summarize(&self, full_tree: bool, track_state: bool) -> Value;

    fn attach_data(&self, include_gc: bool) -> AttachSummary;

    fn resubmit(&mut self, op_type: String, content: Value, local_meta: Option<Value>);

    fn rollback(&mut self, op_type: String, content: Value, local_meta: Option<Value>);

    fn apply_stashed_op(&mut self, content: Value);

    fn request(&self, request: Request) -> Result<Response, Error>;

    fn set_connection_state(&mut self, connected: bool, client_id: Option<String>);

    fn is_root(&self) -> bool;

    fn set_in_memory_root(&mut self);

    fn update_used_routes(&mut self, routes: Vec<String>);

    fn set_tombstone(&mut self, tombstoned: bool);
}

/// Closed replacement for duck-typed object-class predicates (§9 "Dynamic
/// dispatch"): a registry always knows which arm a package path resolves
/// to, so there is no reachable "ambiguous object" case at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectClass {
    SharedObject,
    DataObject { object_type: String },
}

/// Constructs channels for package paths, standing in for the out-of-scope
/// factory registry (§1).
pub trait DataStoreRegistry: Send + Sync {
    fn classify(&self, package_path: &[String]) -> ObjectClass;

    fn instantiate(
        &self,
        package_path: &[String],
        snapshot: Option<&Snapshot>,
    ) -> Box<dyn DataStoreChannel>;
}
