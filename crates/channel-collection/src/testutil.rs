//! Fakes for the external collaborators named in §6, so the subsystem can
//! be exercised end to end without a real container or network. Not
//! `#[cfg(test)]`-gated so integration tests under `tests/` can use it too.

use crate::channel::{
    AttachSummary, DataStoreChannel, DataStoreRegistry, GcData, GcDataNode, ObjectClass, Request,
    Response,
};
use crate::error::Error;
use crate::id::GeneratedId;
use crate::upstream::{AttachState, ChangeKind, UpstreamRuntime};
use crate::wire::{ContainerMessage, Snapshot, SnapshotEntry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// An in-memory stand-in for the parent container runtime.
pub struct FakeRuntime {
    pub attach_state: Mutex<AttachState>,
    pub submitted: Mutex<Vec<(ContainerMessage, Option<Value>)>>,
    pub outbound_refs: Mutex<Vec<(String, String)>>,
    pub node_updates: Mutex<Vec<(String, ChangeKind)>>,
    pub deleted_summarizer_nodes: Mutex<Vec<String>>,
    pub tombstoned_paths: Mutex<Vec<String>>,
    next_numeric_id: AtomicU64,
}

impl FakeRuntime {
    pub fn new(attach_state: AttachState) -> Self {
        Self {
            attach_state: Mutex::new(attach_state),
            submitted: Mutex::new(Vec::new()),
            outbound_refs: Mutex::new(Vec::new()),
            node_updates: Mutex::new(Vec::new()),
            deleted_summarizer_nodes: Mutex::new(Vec::new()),
            tombstoned_paths: Mutex::new(Vec::new()),
            next_numeric_id: AtomicU64::new(0),
        }
    }

    pub fn set_attach_state(&self, state: AttachState) {
        *self.attach_state.lock().unwrap() = state;
    }

    /// Marks a path as tombstoned for the purposes of `node_updated`'s
    /// `allow_tombstone` enforcement.
    pub fn mark_tombstoned(&self, path: &str) {
        self.tombstoned_paths.lock().unwrap().push(path.to_string());
    }
}

#[async_trait]
impl UpstreamRuntime for FakeRuntime {
    fn submit_message(&self, message: ContainerMessage, local_meta: Option<Value>) {
        self.submitted.lock().unwrap().push((message, local_meta));
    }

    fn submit_signal(&self, _address: &str, _signal: Value, _target_client: Option<&str>) {}

    async fn fetch_blob(&self, _id: &str) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn attach_state(&self) -> AttachState {
        *self.attach_state.lock().unwrap()
    }

    fn generate_document_unique_id(&self) -> GeneratedId {
        GeneratedId::Numeric(self.next_numeric_id.fetch_add(1, Ordering::SeqCst))
    }

    fn added_outbound_reference(&self, from_handle: &str, to_handle: &str) {
        self.outbound_refs
            .lock()
            .unwrap()
            .push((from_handle.to_string(), to_handle.to_string()));
    }

    fn node_updated(
        &self,
        path: &str,
        kind: ChangeKind,
        _timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), Error> {
        self.node_updates
            .lock()
            .unwrap()
            .push((path.to_string(), kind));
        Ok(())
    }

    fn create_child_summarizer_node(&self, _id: &str) {}

    fn delete_child_summarizer_node(&self, id: &str) {
        self.deleted_summarizer_nodes
            .lock()
            .unwrap()
            .push(id.to_string());
    }
}

/// A minimal downstream channel stub. Tracks processed ops for assertions
/// and can be configured to report handles to other stores (simulating
/// transitive binds during attach-summary generation, per §4.H).
pub struct StubChannel {
    root: bool,
    tombstoned: bool,
    pub holds_handles_to: Vec<String>,
    pub processed_ops: Mutex<Vec<Value>>,
    realized: AtomicUsize,
}

impl StubChannel {
    pub fn new(root: bool) -> Box<dyn DataStoreChannel> {
        Box::new(Self {
            root,
            tombstoned: false,
            holds_handles_to: Vec::new(),
            processed_ops: Mutex::new(Vec::new()),
            realized: AtomicUsize::new(0),
        })
    }

    pub fn with_handles(root: bool, holds_handles_to: Vec<String>) -> Box<dyn DataStoreChannel> {
        Box::new(Self {
            root,
            tombstoned: false,
            holds_handles_to,
            processed_ops: Mutex::new(Vec::new()),
            realized: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DataStoreChannel for StubChannel {
    async fn realize(&mut self) -> anyhow::Result<()> {
        self.realized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn process(&mut self, op: &crate::wire::OpContents, _local: bool) {
        self.processed_ops.lock().unwrap().push(op.content.clone());
    }

    fn process_signal(&mut self, _signal: Value, _local: bool) {}

    fn get_gc_data(&self, _full_gc: bool) -> GcData {
        GcData {
            nodes: vec![GcDataNode {
                id: String::new(),
                outbound_routes: self.holds_handles_to.clone(),
            }],
        }
    }

    fn summarize(&self, _full_tree: bool, _track_state: bool) -> Value {
        serde_json::json!({ "stub": true })
    }

    fn attach_data(&self, _include_gc: bool) -> AttachSummary {
        AttachSummary {
            snapshot: Snapshot {
                entries: vec![SnapshotEntry {
                    path: "".to_string(),
                    content: serde_json::json!({ "stub": true }),
                    outbound_routes: self.holds_handles_to.clone(),
                }],
                group_id: None,
            },
            bound_ids: self.holds_handles_to.clone(),
        }
    }

    fn resubmit(&mut self, _op_type: String, _content: Value, _local_meta: Option<Value>) {}

    fn rollback(&mut self, _op_type: String, _content: Value, _local_meta: Option<Value>) {}

    fn apply_stashed_op(&mut self, _content: Value) {}

    fn request(&self, request: Request) -> Result<Response, Error> {
        Ok(Response {
            status: 200,
            value: serde_json::json!({ "url": request.url }),
        })
    }

    fn set_connection_state(&mut self, _connected: bool, _client_id: Option<String>) {}

    fn is_root(&self) -> bool {
        self.root
    }

    fn set_in_memory_root(&mut self) {
        self.root = true;
    }

    fn update_used_routes(&mut self, _routes: Vec<String>) {}

    fn set_tombstone(&mut self, tombstoned: bool) {
        self.tombstoned = tombstoned;
    }
}

/// Always resolves to a plain `StubChannel`; good enough for tests that
/// don't care about package-path-specific behavior.
pub struct StubRegistry;

impl DataStoreRegistry for StubRegistry {
    fn classify(&self, _package_path: &[String]) -> ObjectClass {
        ObjectClass::DataObject {
            object_type: "stub".to_string(),
        }
    }

    fn instantiate(
        &self,
        _package_path: &[String],
        _snapshot: Option<&Snapshot>,
    ) -> Box<dyn DataStoreChannel> {
        StubChannel::new(false)
    }
}
