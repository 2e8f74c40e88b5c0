//! Attached (operational) and attach (detached) summaries (§4.H).

use crate::error::Error;
use crate::table::ContextTable;
use crate::upstream::AttachState;
use crate::wire::Snapshot;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct OperationalSummary {
    pub children: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct AttachSummaryTree {
    pub children: BTreeMap<String, Snapshot>,
}

pub struct SummaryBuilder;

impl SummaryBuilder {
    /// Any Attaching context aborts the summary with a data-processing
    /// error; only Attached contexts are included.
    pub fn summarize(
        table: &ContextTable,
        full_tree: bool,
        track_state: bool,
    ) -> Result<OperationalSummary, Error> {
        let mut children = BTreeMap::new();
        for ctx in table.iter_addressable() {
            if ctx.attach_state() == AttachState::Attaching {
                return Err(Error::AttachingDuringCollection(
                    ctx.id.clone(),
                    "summarize",
                ));
            }
            if ctx.attach_state() != AttachState::Attached {
                continue;
            }
            children.insert(ctx.id.clone(), ctx.summarize(full_tree, track_state));
        }
        Ok(OperationalSummary { children })
    }

    /// Iterates to a fixed point: each pass summarizes every bound,
    /// not-already-summarized context. Summarizing a store can report
    /// further ids as transitively bound (handles touched during
    /// serialization); those get bound and picked up by the next pass. The
    /// loop terminates once a pass finds nothing left to summarize, at
    /// which point `not_bound_length` has necessarily stabilized.
    pub fn get_attach_summary(table: &mut ContextTable, include_gc: bool) -> AttachSummaryTree {
        let mut children: BTreeMap<String, Snapshot> = BTreeMap::new();
        let mut summarized: HashSet<String> = HashSet::new();

        loop {
            let candidates: Vec<String> = table
                .iter_bound()
                .filter(|ctx| !summarized.contains(&ctx.id))
                .map(|ctx| ctx.id.clone())
                .collect();

            if candidates.is_empty() {
                break;
            }

            let mut newly_bound = Vec::new();
            for id in &candidates {
                let ctx = table.get(id).expect("candidate id observed above");
                let attach_summary = ctx.attach_data(include_gc);
                children.insert(id.clone(), attach_summary.snapshot);
                summarized.insert(id.clone());
                newly_bound.extend(attach_summary.bound_ids);
            }

            for id in newly_bound {
                if table.get_unbound(&id).is_some() {
                    let _ = table.bind(&id);
                }
            }
        }

        AttachSummaryTree { children }
    }
}
