//! Per-store state (§3, §4.B).

use crate::channel::{AttachSummary, DataStoreChannel, GcData, Request, Response};
use crate::error::Error;
use crate::upstream::AttachState;
use crate::wire::OpContents;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Unbound,
    Bound,
}

pub struct DataStoreContext {
    pub id: String,
    pub package_path: Vec<String>,
    attach_state: AttachState,
    binding: Binding,
    root: bool,
    loaded: bool,
    tombstoned: bool,
    deleted: bool,
    channel: Box<dyn DataStoreChannel>,
}

impl DataStoreContext {
    pub fn new(
        id: String,
        package_path: Vec<String>,
        channel: Box<dyn DataStoreChannel>,
        attach_state: AttachState,
        binding: Binding,
    ) -> Self {
        let root = channel.is_root();
        Self {
            id,
            package_path,
            attach_state,
            binding,
            root,
            loaded: false,
            tombstoned: false,
            deleted: false,
            channel,
        }
    }

    pub fn attach_state(&self) -> AttachState {
        self.attach_state
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn set_binding(&mut self, binding: Binding) {
        self.binding = binding;
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// Monotone: Detached -> Attaching -> Attached, no reverse. Violations
    /// are a programmer error (§7 InternalConsistency).
    pub fn set_attach_state(&mut self, next: AttachState) {
        let legal = matches!(
            (self.attach_state, next),
            (AttachState::Detached, AttachState::Attaching)
                | (AttachState::Attaching, AttachState::Attached)
                | (AttachState::Detached, AttachState::Attached)
        );
        assert!(
            legal,
            "illegal attach state transition for `{}`: {:?} -> {:?}",
            self.id, self.attach_state, next
        );
        self.attach_state = next;
    }

    pub fn set_tombstone(&mut self, tombstoned: bool) {
        self.tombstoned = tombstoned;
        self.channel.set_tombstone(tombstoned);
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub async fn realize(&mut self) -> Result<&mut (dyn DataStoreChannel + 'static), Error> {
        if self.deleted {
            return Err(Error::Deleted(self.id.clone()));
        }
        if !self.loaded {
            self.channel.realize().await.map_err(Error::Channel)?;
            self.loaded = true;
        }
        Ok(self.channel.as_mut())
    }

    pub fn process(&mut self, op: &OpContents, local: bool) -> Result<(), Error> {
        if self.deleted {
            return Err(Error::Deleted(self.id.clone()));
        }
        self.channel.process(op, local);
        Ok(())
    }

    pub fn process_signal(&mut self, signal: serde_json::Value, local: bool) -> Result<(), Error> {
        if self.deleted {
            return Err(Error::Deleted(self.id.clone()));
        }
        self.channel.process_signal(signal, local);
        Ok(())
    }

    pub fn apply_stashed_op(&mut self, content: serde_json::Value) {
        self.channel.apply_stashed_op(content);
    }

    pub fn resubmit(&mut self, op_type: String, content: serde_json::Value, local_meta: Option<serde_json::Value>) {
        self.channel.resubmit(op_type, content, local_meta);
    }

    pub fn rollback(&mut self, op_type: String, content: serde_json::Value, local_meta: Option<serde_json::Value>) {
        self.channel.rollback(op_type, content, local_meta);
    }

    pub fn set_connection_state(&mut self, connected: bool, client_id: Option<String>) {
        self.channel.set_connection_state(connected, client_id);
    }

    pub fn set_in_memory_root(&mut self) {
        self.channel.set_in_memory_root();
        self.root = true;
    }

    pub fn attach_data(&self, include_gc: bool) -> AttachSummary {
        self.channel.attach_data(include_gc)
    }

    pub fn get_gc_data(&self, full_gc: bool) -> GcData {
        self.channel.get_gc_data(full_gc)
    }

    pub fn update_used_routes(&mut self, routes: Vec<String>) {
        self.channel.update_used_routes(routes);
    }

    pub fn summarize(&self, full_tree: bool, track_state: bool) -> serde_json::Value {
        self.channel.summarize(full_tree, track_state)
    }

    pub fn request(&self, request: Request) -> Result<Response, Error> {
        self.channel.request(request)
    }

    pub fn initial_snapshot_details(&self) -> serde_json::Value {
        serde_json::json!({
            "pkg": self.package_path,
            "isRootDataStore": self.root,
        })
    }
}
