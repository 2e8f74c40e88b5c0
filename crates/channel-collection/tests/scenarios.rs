//! Literal end-to-end scenarios S1-S6 from the channel collection design
//! (outbound-reference detection, attach round-trips, alias races, sweep,
//! and tombstoned-but-allowed requests).

use std::sync::Arc;

use channel_collection::channel::{DataStoreChannel, DataStoreRegistry, ObjectClass};
use channel_collection::request::RequestHeaders;
use channel_collection::table::AliasOutcome;
use channel_collection::testutil::{FakeRuntime, StubChannel, StubRegistry};
use channel_collection::upstream::{AttachState, ChangeKind, UpstreamRuntime};
use channel_collection::wire::{AliasMessage, AttachMessage, ContainerMessage, Envelope, HANDLE_TYPE_TAG, OpContents};
use channel_collection::{ChannelCollection, Config};

/// A registry where exactly one package path (`"holder"`) resolves to a
/// store that reports a handle to `target_id`; everything else is a plain
/// rootless stub. Lets S1 exercise the fixed-point attach-summary loop
/// without reaching into `ChannelCollection`'s private table.
struct HandleRegistry {
    target_id: String,
}

impl DataStoreRegistry for HandleRegistry {
    fn classify(&self, _package_path: &[String]) -> ObjectClass {
        ObjectClass::DataObject {
            object_type: "stub".to_string(),
        }
    }

    fn instantiate(
        &self,
        package_path: &[String],
        _snapshot: Option<&channel_collection::wire::Snapshot>,
    ) -> Box<dyn DataStoreChannel> {
        if package_path.first().map(String::as_str) == Some("holder") {
            StubChannel::with_handles(false, vec![self.target_id.clone()])
        } else {
            StubChannel::new(false)
        }
    }
}

fn extract_attach(msg: &ContainerMessage) -> AttachMessage {
    match msg {
        ContainerMessage::Attach(m) => m.clone(),
        other => panic!("expected an Attach message, got {other:?}"),
    }
}

fn extract_alias(msg: &ContainerMessage) -> AliasMessage {
    match msg {
        ContainerMessage::Alias(m) => m.clone(),
        other => panic!("expected an Alias message, got {other:?}"),
    }
}

// S1: container detached, X referenced only through Y's handle, discovered
// by the attach summary's fixed-point loop.
#[tokio::test]
async fn s1_detached_attach_summary_reaches_fixed_point() {
    let runtime = Arc::new(FakeRuntime::new(AttachState::Detached));
    // Detached ids are `2 * existing_context_count`, so the first store
    // created in a fresh collection is always "0"; the registry below is
    // wired to report that id as Y's handle target.
    let registry = Arc::new(HandleRegistry {
        target_id: "0".to_string(),
    });
    let mut collection = ChannelCollection::new(runtime.clone(), registry, Config::default());

    let x = collection.create_data_store(vec!["target".to_string()]).unwrap();
    assert_eq!(x, "0");
    let y = collection.create_data_store(vec!["holder".to_string()]).unwrap();

    // Only Y is made locally visible; X is reachable solely via Y's handle.
    collection.make_visible(&y).unwrap();
    assert_eq!(collection.not_bound_length(), 1, "X is still unbound");

    let summary = collection.get_attach_summary(true);
    let mut expected = vec![x.clone(), y.clone()];
    expected.sort();
    assert_eq!(
        summary.children.keys().cloned().collect::<Vec<_>>(),
        expected
    );
    assert_eq!(collection.not_bound_length(), 0);
}

// S2: container attached, make-visible produces one outbound Attach op and
// a pending-attach entry; the round-tripped ack clears both.
#[tokio::test]
async fn s2_attach_round_trip_clears_pending() {
    let runtime = Arc::new(FakeRuntime::new(AttachState::Attached));
    let mut collection = ChannelCollection::new(
        runtime.clone(),
        Arc::new(StubRegistry),
        Config::default(),
    );

    let id = collection.create_data_store(vec!["s0".to_string()]).unwrap();
    assert_eq!(id, "1", "first attached id is 2*0+1 compact-encoded");

    collection.make_visible(&id).unwrap();
    let mut expected_pending = std::collections::HashSet::new();
    expected_pending.insert("1".to_string());
    assert_eq!(collection.pending_attach(), &expected_pending);

    let submitted = runtime.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    let attach = extract_attach(&submitted[0].0);
    assert_eq!(attach.id, "1");
    assert_eq!(attach.store_type, "s0");

    collection
        .process(ContainerMessage::Attach(attach), true)
        .await
        .unwrap();

    assert!(collection.pending_attach().is_empty());
    assert_eq!(
        collection.context_attach_state("1"),
        Some(AttachState::Attached)
    );
}

// S3: two clients race to alias "root"; the first processed wins and the
// second observes `alreadyProcessed` and resolves `Conflict`.
#[tokio::test]
async fn s3_concurrent_alias_resolves_conflict() {
    let runtime = Arc::new(FakeRuntime::new(AttachState::Attached));
    let mut collection = ChannelCollection::new(
        runtime.clone(),
        Arc::new(StubRegistry),
        Config::default(),
    );

    let a = collection.create_data_store(vec!["a".to_string()]).unwrap();
    let b = collection.create_data_store(vec!["b".to_string()]).unwrap();

    let submission = collection.alias(&a, "root").unwrap();
    let submitted = runtime.submitted.lock().unwrap().clone();
    let local_alias_op = extract_alias(&submitted.last().unwrap().0);

    // A remote client's Alias("root" -> b) is sequenced first and wins.
    collection
        .process(
            ContainerMessage::Alias(AliasMessage {
                internal_id: b.clone(),
                alias: "root".to_string(),
            }),
            false,
        )
        .await
        .unwrap();
    assert_eq!(collection.aliases().get("root"), Some(&b));

    // Our own Alias op then round-trips and loses the race.
    collection
        .process(ContainerMessage::Alias(local_alias_op), true)
        .await
        .unwrap();

    assert_eq!(submission.await_outcome().await, AliasOutcome::Conflict);
    assert_eq!(collection.aliases().get("root"), Some(&b));
}

// S4: a channel op carries a serialized handle; the outbound reference is
// reported with the envelope's address and the op's `address` sub-path.
#[tokio::test]
async fn s4_outbound_reference_detected_in_op_payload() {
    let runtime = Arc::new(FakeRuntime::new(AttachState::Detached));
    let mut collection = ChannelCollection::new(
        runtime.clone(),
        Arc::new(StubRegistry),
        Config::default(),
    );

    let id = collection.create_data_store(vec!["s".to_string()]).unwrap();
    collection.make_visible(&id).unwrap();

    let envelope = Envelope {
        address: id.clone(),
        contents: OpContents {
            op_type: "op".to_string(),
            content: serde_json::json!({
                "handle": {"type": HANDLE_TYPE_TAG, "url": "/2/dds1"},
                "address": "dds0",
            }),
        },
    };
    collection
        .process(ContainerMessage::DataStoreOp(envelope), true)
        .await
        .unwrap();

    let refs = runtime.outbound_refs.lock().unwrap();
    assert!(refs
        .iter()
        .any(|(from, to)| from == &format!("/{id}/dds0") && to == "/2/dds1"));
}

// S5: sweep-ready routes for a store (and a sub-path under it) delete the
// store exactly once; subsequent ops addressed to it are dropped silently.
#[tokio::test]
async fn s5_sweep_deletes_store_and_drops_later_ops() {
    let runtime = Arc::new(FakeRuntime::new(AttachState::Detached));
    let mut collection = ChannelCollection::new(
        runtime.clone(),
        Arc::new(StubRegistry),
        Config::default(),
    );

    let id = collection.create_data_store(vec!["s".to_string()]).unwrap();
    collection.make_visible(&id).unwrap();

    let routes = vec![format!("/{id}"), format!("/{id}/dds/x")];
    let deleted = collection.delete_sweep_ready(routes.clone());
    assert_eq!(deleted, routes);
    assert_eq!(
        runtime.deleted_summarizer_nodes.lock().unwrap().clone(),
        vec![id.clone()]
    );

    // An op addressed to the now-deleted store is dropped, not errored.
    let envelope = Envelope {
        address: id.clone(),
        contents: OpContents {
            op_type: "op".to_string(),
            content: serde_json::json!({}),
        },
    };
    let result = collection
        .process(ContainerMessage::DataStoreOp(envelope), true)
        .await;
    assert!(result.is_ok());
}

// S6: a request through a tombstoned-but-allowed store is served and fires
// exactly one `node_updated("Loaded", ...)` notification.
#[tokio::test]
async fn s6_request_through_tombstoned_alias_with_allow_flag() {
    let runtime = Arc::new(FakeRuntime::new(AttachState::Detached));
    let mut collection = ChannelCollection::new(
        runtime.clone(),
        Arc::new(StubRegistry),
        Config::default(),
    );

    let id = collection.create_data_store(vec!["alpha-store".to_string()]).unwrap();
    let submission = collection.alias(&id, "alpha").unwrap();
    let submitted = runtime.submitted.lock().unwrap().clone();
    let alias_op = extract_alias(&submitted.last().unwrap().0);
    collection
        .process(ContainerMessage::Alias(alias_op), true)
        .await
        .unwrap();
    assert_eq!(submission.await_outcome().await, AliasOutcome::Success);

    collection.update_tombstoned_routes(vec![format!("/{id}")]);

    let response = collection
        .request(
            "/alpha/sub?x=1",
            RequestHeaders {
                wait: true,
                via_handle: false,
                allow_tombstone: true,
                allow_inactive: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    // The query string is stripped before being forwarded as the sub-path.
    assert_eq!(response.value, serde_json::json!({"url": "sub"}));

    let updates = runtime.node_updates.lock().unwrap();
    let loaded_count = updates
        .iter()
        .filter(|(path, kind)| path == "/alpha/sub" && *kind == ChangeKind::Loaded)
        .count();
    assert_eq!(loaded_count, 1);
}
