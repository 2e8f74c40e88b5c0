//! Outbound/inbound attach handling (§4.C).

use crate::channel::DataStoreRegistry;
use crate::error::Error;
use crate::table::ContextTable;
use crate::upstream::{AttachState, UpstreamRuntime};
use crate::wire::{AttachMessage, ContainerMessage};

#[derive(Default)]
pub struct AttachProtocol {
    telemetry_fired: bool,
}

impl AttachProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes a bound, detached store into an outbound Attach message
    /// and records it as pending.
    #[tracing::instrument(skip(self, table, runtime), fields(id = %id))]
    pub fn submit_attach(
        &mut self,
        table: &mut ContextTable,
        runtime: &dyn UpstreamRuntime,
        id: &str,
    ) -> Result<(), Error> {
        let ctx = table.get(id).ok_or_else(|| Error::NoContext(id.to_string()))?;
        let store_type = ctx.package_path.last().cloned().unwrap_or_default();
        let attach_summary = ctx.attach_data(true);

        let msg = AttachMessage {
            id: id.to_string(),
            store_type,
            snapshot: Some(attach_summary.snapshot),
        };

        let ctx = table
            .get_mut(id)
            .expect("context observed above must still be present");
        ctx.set_attach_state(AttachState::Attaching);

        table.pending_attach.insert(id.to_string());
        runtime.submit_message(ContainerMessage::Attach(msg), None);
        Ok(())
    }

    /// Reverts a pending, not-yet-acked attach: clears the pending entry and
    /// the store reverts to Unbound.
    pub fn rollback_attach(&mut self, table: &mut ContextTable, id: &str) -> Result<(), Error> {
        table.pending_attach.remove(id);
        table.unbind(id)
    }

    #[tracing::instrument(skip(self, table, runtime, registry, msg), fields(id = %msg.id, local))]
    pub fn process_attach(
        &mut self,
        table: &mut ContextTable,
        runtime: &dyn UpstreamRuntime,
        registry: &dyn DataStoreRegistry,
        msg: AttachMessage,
        local: bool,
    ) -> Result<(), Error> {
        table.new_since_last_gc.push(msg.id.clone());

        if let Some(snapshot) = &msg.snapshot {
            for entry in &snapshot.entries {
                for target in &entry.outbound_routes {
                    runtime.added_outbound_reference(
                        &format!("/{}{}", msg.id, entry.path),
                        target,
                    );
                }
            }
        }

        if local {
            if !table.pending_attach.remove(&msg.id) {
                return Err(Error::AttachAckWithoutPending(msg.id));
            }
            let ctx = table
                .get_mut(&msg.id)
                .expect("locally pending attach must have a context");
            ctx.set_attach_state(AttachState::Attached);
        } else {
            if table.contains(&msg.id) || table.aliases.contains_key(&msg.id) {
                tracing::error!(id = %msg.id, "duplicate data store id observed on remote attach");
                return Err(Error::DuplicateDataStore(msg.id));
            }

            let channel = registry.instantiate(&[msg.store_type.clone()], msg.snapshot.as_ref());
            let ctx = crate::context::DataStoreContext::new(
                msg.id.clone(),
                vec![msg.store_type.clone()],
                channel,
                AttachState::Attached,
                crate::context::Binding::Bound,
            );
            table.add_bound_or_remoted(ctx, true);
        }

        if !self.telemetry_fired {
            self.telemetry_fired = true;
            tracing::info!(first_attach_id = %msg.id, "processed first attach op for container");
        }
        Ok(())
    }
}
