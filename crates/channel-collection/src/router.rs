//! Dispatch for container-level messages and signals (§4.E), and the
//! channel-op pipeline including outbound-reference detection (§4.F).

use crate::config::Config;
use crate::error::Error;
use crate::table::ContextTable;
use crate::upstream::{ChangeKind, UpstreamRuntime};
use crate::wire::{Envelope, HANDLE_TYPE_TAG};
use serde_json::Value;

pub struct ChannelOpPipeline;

impl ChannelOpPipeline {
    #[tracing::instrument(skip(table, runtime, config, envelope), fields(address = %envelope.address))]
    pub fn process_op(
        table: &mut ContextTable,
        runtime: &dyn UpstreamRuntime,
        config: &Config,
        envelope: Envelope,
        local: bool,
    ) -> Result<(), Error> {
        if table.is_deleted(&envelope.address) {
            tracing::error!(address = %envelope.address, "dropping op addressed to deleted data store");
            return Ok(());
        }

        let ctx = table
            .get_mut(&envelope.address)
            .ok_or_else(|| Error::NoContext(envelope.address.clone()))?;
        ctx.process(&envelope.contents, local)?;

        if !config.detect_outbound_routes_via_store {
            let sub_path = first_address_field(&envelope.contents.content).unwrap_or_default();
            for target in detect_outbound_references(&envelope.contents.content) {
                runtime.added_outbound_reference(
                    &format!("/{}/{}", envelope.address, sub_path),
                    &target,
                );
            }
        }

        runtime.node_updated(
            &format!("/{}", envelope.address),
            ChangeKind::Changed,
            now(),
        )?;
        Ok(())
    }
}

pub struct OpRouter;

impl OpRouter {
    pub fn process_signal(
        table: &mut ContextTable,
        address: &str,
        signal: Value,
        local: bool,
    ) {
        if table.is_deleted(address) {
            tracing::warn!(%address, "dropping signal addressed to deleted data store");
            return;
        }
        match table.get_mut(address) {
            Some(ctx) => {
                if let Err(error) = ctx.process_signal(signal, local) {
                    tracing::warn!(%address, %error, "failed to deliver signal");
                }
            }
            None => tracing::warn!(%address, "signal addressed to unknown data store"),
        }
    }
}

/// Pure function of op contents: every `url` occurring under a
/// `{type: "__handle__", url: string}` shape, in JSON traversal order
/// (§8 invariant 5).
pub fn detect_outbound_references(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    walk_handles(value, &mut out);
    out
}

fn walk_handles(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some(HANDLE_TYPE_TAG) {
                if let Some(url) = map.get("url").and_then(Value::as_str) {
                    out.push(url.to_string());
                }
            }
            for v in map.values() {
                walk_handles(v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_handles(item, out);
            }
        }
        _ => {}
    }
}

/// The first `address` string property encountered in traversal order,
/// used as the DDS sub-path for outbound-reference attribution.
fn first_address_field(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(address) = map.get("address").and_then(Value::as_str) {
                return Some(address.to_string());
            }
            map.values().find_map(first_address_field)
        }
        Value::Array(items) => items.iter().find_map(first_address_field),
        _ => None,
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_handles_in_traversal_order() {
        // matches S4.
        let content = json!({
            "handle": {"type": "__handle__", "url": "/2/dds1"},
            "address": "dds0",
        });
        assert_eq!(detect_outbound_references(&content), vec!["/2/dds1"]);
        assert_eq!(first_address_field(&content), Some("dds0".to_string()));
    }

    #[test]
    fn ignores_non_handle_shapes() {
        let content = json!({"type": "not-a-handle", "url": "/x"});
        assert!(detect_outbound_references(&content).is_empty());
    }

    #[test]
    fn finds_nested_handles_in_order() {
        let content = json!([
            {"type": "__handle__", "url": "/a"},
            {"nested": {"type": "__handle__", "url": "/b"}},
        ]);
        assert_eq!(
            detect_outbound_references(&content),
            vec!["/a".to_string(), "/b".to_string()]
        );
    }
}
