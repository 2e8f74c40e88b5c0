//! The garbage-collection interface (§4.G).

use crate::error::Error;
use crate::table::{ContextTable, DeleteOutcome};
use crate::upstream::{AttachState, UpstreamRuntime};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct GcNode {
    /// Absolute path from the container root, e.g. `/3/dds1`.
    pub id: String,
    pub outbound_routes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GcGraph {
    pub nodes: Vec<GcNode>,
}

pub struct GcInterface;

impl GcInterface {
    /// Fails deterministically if any context is Attaching (§8 invariant 4):
    /// that indicates the summarizer is running over locally uncommitted
    /// state, a design-invariant violation.
    pub fn get_gc_data(table: &ContextTable, full_gc: bool) -> Result<GcGraph, Error> {
        let mut nodes = Vec::new();
        let mut roots = Vec::new();

        for ctx in table.iter_addressable() {
            if ctx.attach_state() == AttachState::Attaching {
                return Err(Error::AttachingDuringCollection(
                    ctx.id.clone(),
                    "GC data collection",
                ));
            }
            if ctx.attach_state() != AttachState::Attached {
                continue;
            }

            let data = ctx.get_gc_data(full_gc);
            for node in data.nodes {
                nodes.push(GcNode {
                    id: format!("/{}{}", ctx.id, node.id),
                    outbound_routes: node.outbound_routes,
                });
            }
            if ctx.is_root() {
                roots.push(format!("/{}", ctx.id));
            }
        }

        nodes.push(GcNode {
            id: "/".to_string(),
            outbound_routes: roots,
        });
        Ok(GcGraph { nodes })
    }

    pub fn update_state_before_gc(table: &mut ContextTable, runtime: &dyn UpstreamRuntime) {
        for id in table.new_since_last_gc.drain(..).collect::<Vec<_>>() {
            if let Some(ctx) = table.get(&id) {
                if ctx.is_root() {
                    runtime.added_outbound_reference("/", &format!("/{}", id));
                }
            }
        }
    }

    #[tracing::instrument(skip(table, routes))]
    pub fn update_used_routes(table: &mut ContextTable, routes: Vec<String>) -> Result<(), Error> {
        let mut by_store: HashMap<String, Vec<String>> = HashMap::new();
        for route in routes {
            let segs: Vec<&str> = route.splitn(3, '/').collect();
            // route is "/{id}" or "/{id}/{rest...}"; segs[0] is always "".
            if let Some(id) = segs.get(1) {
                by_store.entry(id.to_string()).or_default().push(route.clone());
            }
        }

        for ctx in table.iter_addressable_mut() {
            let subs = by_store.remove(&ctx.id).unwrap_or_default();
            ctx.update_used_routes(subs);
        }

        if let Some((unknown_id, _)) = by_store.into_iter().next() {
            return Err(Error::NoContext(unknown_id));
        }
        Ok(())
    }

    /// A store is tombstoned iff the exact route `/id` (length 2 after
    /// split on `/`) appears; sub-routes (length > 2) don't tombstone the
    /// parent store.
    pub fn update_tombstoned_routes(table: &mut ContextTable, routes: Vec<String>) {
        let tombstoned: std::collections::HashSet<&str> = routes
            .iter()
            .filter_map(|route| {
                let segs: Vec<&str> = route.split('/').collect();
                (segs.len() == 2).then(|| segs[1])
            })
            .collect();

        for ctx in table.iter_addressable_mut() {
            ctx.set_tombstone(tombstoned.contains(ctx.id.as_str()));
        }
    }

    #[tracing::instrument(skip(table, routes, runtime))]
    pub fn delete_sweep_ready(
        table: &mut ContextTable,
        routes: Vec<String>,
        runtime: &dyn UpstreamRuntime,
    ) -> Vec<String> {
        for route in &routes {
            let segs: Vec<&str> = route.split('/').collect();
            if segs.len() != 2 {
                continue;
            }
            let id = segs[1];
            match table.delete(id) {
                DeleteOutcome::Deleted => runtime.delete_child_summarizer_node(id),
                DeleteOutcome::AlreadyDeleted => {
                    tracing::info!(%id, "sweep: data store already deleted")
                }
                DeleteOutcome::NotFound => {
                    tracing::error!(%id, "sweep: data store not found for sweep-ready route")
                }
            }
        }
        routes
    }
}
