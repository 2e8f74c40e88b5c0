//! The alias reservation/commit protocol (§4.D).

use crate::attach::AttachProtocol;
use crate::error::Error;
use crate::table::{AliasOutcome, ContextTable, PendingAlias};
use crate::upstream::{AttachState, UpstreamRuntime};
use crate::wire::{AliasMessage, ContainerMessage};
use std::sync::Arc;

/// What submitting an alias reservation hands back. Submission itself is
/// synchronous (it only needs `&mut ContextTable`); the eventual outcome is
/// a separate value the caller awaits on its own schedule, so the table
/// stays free for the collection to keep processing incoming ops while a
/// reservation is outstanding (§5's single-threaded cooperative model: the
/// wait must not hold the table hostage).
pub enum AliasSubmission {
    Immediate(AliasOutcome),
    Pending(Arc<PendingAlias>),
}

impl AliasSubmission {
    pub async fn await_outcome(self) -> AliasOutcome {
        match self {
            AliasSubmission::Immediate(outcome) => outcome,
            AliasSubmission::Pending(pending) => pending.wait().await,
        }
    }
}

#[derive(Default)]
pub struct AliasProtocol;

impl AliasProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical global-uniqueness predicate: `x` has already been
    /// claimed, either as an alias or as an internal id.
    pub fn already_processed(table: &ContextTable, x: &str) -> bool {
        table.aliases.contains_key(x) || table.contains(x)
    }

    #[tracing::instrument(skip(self, table, runtime, attach), fields(%internal_id, alias = %desired_alias))]
    pub fn alias(
        &mut self,
        table: &mut ContextTable,
        runtime: &dyn UpstreamRuntime,
        attach: &mut AttachProtocol,
        internal_id: String,
        desired_alias: String,
    ) -> Result<AliasSubmission, Error> {
        if table
            .aliases
            .values()
            .any(|target| target == &internal_id)
        {
            return Ok(AliasSubmission::Immediate(AliasOutcome::AlreadyAliased));
        }

        if table.get_unbound(&internal_id).is_some() {
            table.bind(&internal_id)?;
            if runtime.attach_state() != AttachState::Detached {
                attach.submit_attach(table, runtime, &internal_id)?;
            }
        }

        let pending = PendingAlias::new();
        table.pending_aliases.insert(desired_alias.clone(), pending.clone());

        runtime.submit_message(
            ContainerMessage::Alias(AliasMessage {
                internal_id,
                alias: desired_alias,
            }),
            None,
        );

        Ok(AliasSubmission::Pending(pending))
    }

    #[tracing::instrument(skip(self, table, runtime, msg), fields(internal_id = %msg.internal_id, alias = %msg.alias, local))]
    pub fn process_alias(
        &mut self,
        table: &mut ContextTable,
        runtime: &dyn UpstreamRuntime,
        msg: AliasMessage,
        local: bool,
    ) -> Result<(), Error> {
        let outcome = if Self::already_processed(table, &msg.alias) {
            AliasOutcome::Conflict
        } else if !table.contains(&msg.internal_id) {
            tracing::error!(
                internal_id = %msg.internal_id,
                alias = %msg.alias,
                "alias op references unknown data store"
            );
            AliasOutcome::Conflict
        } else {
            table.aliases.insert(msg.alias.clone(), msg.internal_id.clone());
            let ctx = table
                .get_mut(&msg.internal_id)
                .expect("existence confirmed above");
            ctx.set_in_memory_root();
            runtime.added_outbound_reference("/", &format!("/{}", msg.alias));
            AliasOutcome::Success
        };

        if let Some(pending) = table.pending_aliases.remove(&msg.alias) {
            debug_assert!(local, "pending_aliases entries are only installed locally");
            pending.resolve(outcome);
        }

        Ok(())
    }
}
