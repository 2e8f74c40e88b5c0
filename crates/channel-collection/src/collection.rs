//! The public entry point: wires the four protocols and the context table
//! together behind the external interfaces of §6.

use crate::alias::{AliasProtocol, AliasSubmission};
use crate::attach::AttachProtocol;
use crate::channel::DataStoreRegistry;
use crate::config::Config;
use crate::context::{Binding, DataStoreContext};
use crate::error::{Error, Severity};
use crate::gc::{GcGraph, GcInterface};
use crate::id;
use crate::request::{RequestHeaders, RequestRouter};
use crate::router::{ChannelOpPipeline, OpRouter};
use crate::summary::{AttachSummaryTree, OperationalSummary, SummaryBuilder};
use crate::table::ContextTable;
use crate::upstream::{AttachState, UpstreamRuntime};
use crate::wire::ContainerMessage;
use std::sync::Arc;

pub struct ChannelCollection {
    table: ContextTable,
    attach: AttachProtocol,
    alias: AliasProtocol,
    config: Config,
    runtime: Arc<dyn UpstreamRuntime>,
    registry: Arc<dyn DataStoreRegistry>,
    disposed: bool,
}

impl ChannelCollection {
    pub fn new(
        runtime: Arc<dyn UpstreamRuntime>,
        registry: Arc<dyn DataStoreRegistry>,
        config: Config,
    ) -> Self {
        Self {
            table: ContextTable::new(),
            attach: AttachProtocol::new(),
            alias: AliasProtocol::new(),
            config,
            runtime,
            registry,
            disposed: false,
        }
    }

    fn check_disposed(&self) -> Result<(), Error> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Reports an error's severity-appropriate log, applying the
    /// InternalConsistency debug/production split from §7.
    fn observe_error(&self, error: Error) -> Error {
        match error.severity() {
            Severity::InternalConsistency => {
                error.assert_consistency(self.config.panic_on_internal_consistency_violation)
            }
            Severity::DataCorruption | Severity::DataProcessing => {
                tracing::error!(%error, "fatal error in channel collection");
                error
            }
            Severity::Transient => {
                tracing::warn!(%error, "transient error in channel collection");
                error
            }
            Severity::Usage | Severity::NotFound => error,
        }
    }

    /// Creates a new, locally-owned, Unbound+Detached data store.
    pub fn create_data_store(&mut self, package_path: Vec<String>) -> Result<String, Error> {
        self.check_disposed()?;
        let id = match self.runtime.attach_state() {
            AttachState::Detached => id::detached_id(
                self.config.detached_id_seed.unwrap_or_else(|| self.table.size()),
            ),
            AttachState::Attaching | AttachState::Attached => {
                id::attached_id(self.runtime.generate_document_unique_id())
            }
        };
        let channel = self.registry.instantiate(&package_path, None);
        let ctx = DataStoreContext::new(
            id.clone(),
            package_path,
            channel,
            AttachState::Detached,
            Binding::Unbound,
        );
        self.table.add_unbound(ctx);
        Ok(id)
    }

    /// Makes a store reachable: binds it, and if the container is already
    /// attached, submits an outbound Attach op for it.
    pub fn make_visible(&mut self, id: &str) -> Result<(), Error> {
        self.check_disposed()?;
        self.table.bind(id).map_err(|e| self.observe_error(e))?;
        if self.runtime.attach_state() != AttachState::Detached {
            self.attach
                .submit_attach(&mut self.table, self.runtime.as_ref(), id)
                .map_err(|e| self.observe_error(e))?;
        }
        Ok(())
    }

    pub fn rollback_attach(&mut self, id: &str) -> Result<(), Error> {
        self.check_disposed()?;
        self.attach.rollback_attach(&mut self.table, id)
    }

    #[tracing::instrument(skip(self, msg))]
    pub async fn process(&mut self, msg: ContainerMessage, local: bool) -> Result<(), Error> {
        self.check_disposed()?;
        let result = match msg {
            ContainerMessage::Attach(m) => self.attach.process_attach(
                &mut self.table,
                self.runtime.as_ref(),
                self.registry.as_ref(),
                m,
                local,
            ),
            ContainerMessage::Alias(m) => {
                self.alias
                    .process_alias(&mut self.table, self.runtime.as_ref(), m, local)
            }
            ContainerMessage::DataStoreOp(env) => ChannelOpPipeline::process_op(
                &mut self.table,
                self.runtime.as_ref(),
                &self.config,
                env,
                local,
            ),
        };
        result.map_err(|e| self.observe_error(e))
    }

    pub fn process_signal(&mut self, address: &str, signal: serde_json::Value, local: bool) {
        if self.disposed {
            return;
        }
        OpRouter::process_signal(&mut self.table, address, signal, local);
    }

    /// Submits an alias reservation and returns immediately; the caller
    /// awaits the returned handle on its own schedule, independent of this
    /// collection's `&mut self` borrow, so other ops (including the echo
    /// that resolves this very reservation) can still be processed while it
    /// is outstanding.
    pub fn alias(
        &mut self,
        internal_id: &str,
        desired_alias: &str,
    ) -> Result<AliasSubmission, Error> {
        self.check_disposed()?;
        self.alias.alias(
            &mut self.table,
            self.runtime.as_ref(),
            &mut self.attach,
            internal_id.to_string(),
            desired_alias.to_string(),
        )
    }

    pub async fn request(
        &mut self,
        url: &str,
        headers: RequestHeaders,
    ) -> Result<crate::channel::Response, Error> {
        self.check_disposed()?;
        RequestRouter::resolve(&mut self.table, self.runtime.as_ref(), url, headers).await
    }

    pub fn resubmit(
        &mut self,
        address: &str,
        op_type: String,
        content: serde_json::Value,
        local_meta: Option<serde_json::Value>,
    ) -> Result<(), Error> {
        self.check_disposed()?;
        let ctx = self
            .table
            .get_mut(address)
            .ok_or_else(|| Error::NoContext(address.to_string()))?;
        ctx.resubmit(op_type, content, local_meta);
        Ok(())
    }

    pub fn rollback(
        &mut self,
        address: &str,
        op_type: String,
        content: serde_json::Value,
        local_meta: Option<serde_json::Value>,
    ) -> Result<(), Error> {
        self.check_disposed()?;
        let ctx = self
            .table
            .get_mut(address)
            .ok_or_else(|| Error::NoContext(address.to_string()))?;
        ctx.rollback(op_type, content, local_meta);
        Ok(())
    }

    pub fn set_connection_state(&mut self, connected: bool, client_id: Option<String>) {
        for ctx in self.table.iter_addressable_mut() {
            ctx.set_connection_state(connected, client_id.clone());
        }
    }

    pub fn get_gc_data(&self, full_gc: bool) -> Result<GcGraph, Error> {
        GcInterface::get_gc_data(&self.table, full_gc).map_err(|e| self.observe_error(e))
    }

    pub fn update_state_before_gc(&mut self) {
        GcInterface::update_state_before_gc(&mut self.table, self.runtime.as_ref());
    }

    pub fn update_used_routes(&mut self, routes: Vec<String>) -> Result<(), Error> {
        GcInterface::update_used_routes(&mut self.table, routes).map_err(|e| self.observe_error(e))
    }

    pub fn update_tombstoned_routes(&mut self, routes: Vec<String>) {
        GcInterface::update_tombstoned_routes(&mut self.table, routes);
    }

    pub fn delete_sweep_ready(&mut self, routes: Vec<String>) -> Vec<String> {
        GcInterface::delete_sweep_ready(&mut self.table, routes, self.runtime.as_ref())
    }

    pub fn summarize(
        &self,
        full_tree: bool,
        track_state: bool,
    ) -> Result<OperationalSummary, Error> {
        SummaryBuilder::summarize(&self.table, full_tree, track_state)
            .map_err(|e| self.observe_error(e))
    }

    pub fn get_attach_summary(&mut self, include_gc: bool) -> AttachSummaryTree {
        SummaryBuilder::get_attach_summary(&mut self.table, include_gc)
    }

    pub fn not_bound_length(&self) -> usize {
        self.table.not_bound_length()
    }

    pub fn pending_attach(&self) -> &std::collections::HashSet<String> {
        &self.table.pending_attach
    }

    pub fn context_attach_state(&self, id: &str) -> Option<AttachState> {
        self.table.get(id).map(|ctx| ctx.attach_state())
    }

    pub fn aliases(&self) -> &std::collections::HashMap<String, String> {
        &self.table.aliases
    }

    /// Idempotent: marks every context terminal and resolves any still
    /// pending alias resolvers with the historical `Success` contract
    /// (§5, §10.5). After this, all public operations return
    /// `Error::Disposed`.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.table.dispose();
    }
}
