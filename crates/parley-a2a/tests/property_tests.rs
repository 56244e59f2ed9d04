//! Property-Based Tests for the Envelope Codec and Task Lifecycle
//!
//! These tests check invariants that must hold for any input: envelopes
//! survive an encode/decode cycle regardless of member order, and task
//! statuses never move backwards.

use parley_a2a::envelope::{self, Envelope, RequestId, RpcError, RpcRequest, RpcResponse};
use parley_a2a::{MessageRole, TaskMessage, TaskStatus, TaskStore};
use proptest::prelude::*;
use serde_json::{Map, Value};

// Strategy for arbitrary JSON values without floats
fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn request_id_strategy() -> impl Strategy<Value = RequestId> {
    prop_oneof![
        any::<i64>().prop_map(RequestId::Number),
        "[a-z0-9-]{0,12}".prop_map(RequestId::String),
        Just(RequestId::Null),
    ]
}

fn rpc_error_strategy() -> impl Strategy<Value = RpcError> {
    (
        any::<i32>(),
        ".{0,24}",
        prop::option::of(json_value_strategy()),
    )
        .prop_map(|(code, message, data)| RpcError {
            code,
            message,
            data,
        })
}

fn envelope_strategy() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        (
            "[a-zA-Z]{1,16}",
            prop::option::of(json_value_strategy()),
            request_id_strategy()
        )
            .prop_map(|(method, params, id)| Envelope::Request(RpcRequest {
                method,
                params,
                id
            })),
        (request_id_strategy(), json_value_strategy())
            .prop_map(|(id, result)| Envelope::Response(RpcResponse::success(id, result))),
        (request_id_strategy(), rpc_error_strategy())
            .prop_map(|(id, error)| Envelope::Response(RpcResponse::failure(id, error))),
    ]
}

/// Render an object with its top-level members in the given order
fn render_in_order(object: &Map<String, Value>, order: &[usize]) -> String {
    let entries: Vec<(&String, &Value)> = object.iter().collect();
    let members: Vec<String> = order
        .iter()
        .map(|&i| {
            let (key, value) = entries[i];
            format!(
                "{}:{}",
                serde_json::to_string(key).unwrap(),
                serde_json::to_string(value).unwrap()
            )
        })
        .collect();
    format!("{{{}}}", members.join(","))
}

fn rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Pending => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Completed | TaskStatus::Failed => 2,
    }
}

#[derive(Debug, Clone)]
enum Op {
    SetStatus(TaskStatus),
    Append(String),
    Process { succeed: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop_oneof![
            Just(TaskStatus::Pending),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Failed),
        ]
        .prop_map(Op::SetStatus),
        "[a-z]{1,8}".prop_map(Op::Append),
        any::<bool>().prop_map(|succeed| Op::Process { succeed }),
    ]
}

proptest! {
    /// Property: decode(encode(e)) == e for every well-formed envelope
    #[test]
    fn prop_envelope_round_trip(envelope in envelope_strategy()) {
        let bytes = envelope::encode(&envelope).unwrap();
        let decoded = envelope::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, envelope);
    }

    /// Property: member order on the wire does not affect decoding
    #[test]
    fn prop_member_order_irrelevant(
        (envelope, order) in envelope_strategy().prop_flat_map(|e| {
            let len = e.to_value().as_object().map_or(0, |o| o.len());
            (Just(e), Just((0..len).collect::<Vec<_>>()).prop_shuffle())
        })
    ) {
        let value = envelope.to_value();
        let object = value.as_object().unwrap();
        let text = render_in_order(object, &order);
        let decoded = envelope::decode(text.as_bytes()).unwrap();
        prop_assert_eq!(decoded, envelope);
    }

    /// Property: observed statuses never go backwards and a terminal
    /// status never changes
    #[test]
    fn prop_status_is_monotonic(ops in prop::collection::vec(op_strategy(), 1..20)) {
        tokio_test::block_on(async {
            let store = TaskStore::new();
            store.create_task(Some("t".into()), None).await.unwrap();
            let mut previous = TaskStatus::Pending;
            let mut previous_len = 0;

            for op in ops {
                match op {
                    Op::SetStatus(status) => {
                        store.set_status("t", status).await.unwrap();
                    }
                    Op::Append(text) => {
                        store.append_message("t", MessageRole::User, text).await.unwrap();
                    }
                    Op::Process { succeed } => {
                        let _ = store
                            .process_message("t", TaskMessage::user("go"), |_| async move {
                                if succeed { Ok("done".to_string()) } else { Err("nope".to_string()) }
                            })
                            .await;
                    }
                }

                let task = store.get_task("t").await.unwrap();
                prop_assert!(rank(task.status) >= rank(previous));
                if previous.is_terminal() {
                    prop_assert_eq!(task.status, previous);
                }
                prop_assert!(task.messages.len() >= previous_len);
                previous = task.status;
                previous_len = task.messages.len();
            }
            Ok(())
        })?;
    }
}
