//! Behaviour of a manager driven only through its public API.

use assert_matches::assert_matches;
use parking_lot::Mutex;
use serde_json::json;
use sman::prelude::*;
use sman::{ActionError, JsonAction, MergeError};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::fmt::MakeWriter;

fn initial() -> State {
    State::from(json!({
        "count": 0,
        "complex": {"arr": [{"id": 1}]}
    }))
}

async fn plus(ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
    let num: i64 = args.get(0)?;
    let count = ctx.get_state().get("count").and_then(State::as_i64).unwrap_or(0);
    Ok(UpdateMapping::new().set("count", count + num)?)
}

async fn change_id(_ctx: ActionContext, args: Args) -> ActionResult<UpdateMapping> {
    let id: String = args.get(0)?;
    Ok(UpdateMapping::new().set("complex.arr.0.id", id)?)
}

async fn count_and_id(_ctx: ActionContext, _args: Args) -> ActionResult<UpdateMapping> {
    Ok(UpdateMapping::new()
        .set("count", 10)?
        .set("complex.arr.0.id", "X")?)
}

/// Records every slice it is handed.
#[derive(Default)]
struct Recorder {
    slice: Mutex<Slice>,
    seen: Mutex<Vec<Slice>>,
}

impl Subscriber for Recorder {
    fn slice(&self) -> Slice {
        self.slice.lock().clone()
    }

    fn set_slice(&self, slice: Slice) {
        self.seen.lock().push(slice.clone());
        *self.slice.lock() = slice;
    }

    fn seed(&self, slice: Slice) {
        *self.slice.lock() = slice;
    }
}

#[tokio::test]
async fn plus_then_change_id() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);
    manager.register_action("CHANGE_ID", change_id);
    let before = manager.get_state();

    manager.trigger("PLUS", Args::one(10)).await.expect("PLUS");
    manager
        .trigger("CHANGE_ID", Args::one("Homer Simpson"))
        .await
        .expect("CHANGE_ID");

    let after = manager.get_state();
    assert_eq!(
        after.to_json(),
        json!({"count": 10, "complex": {"arr": [{"id": "Homer Simpson"}]}})
    );
    assert_ne!(before, after);

    let path = Path::parse("complex.arr.0").expect("valid path");
    let old_item = before.get_path(&path).expect("old item");
    let new_item = after.get_path(&path).expect("new item");
    assert_ne!(old_item, new_item);
    assert!(!State::same(old_item, new_item));
    assert_eq!(before.to_json(), initial().to_json());
}

#[tokio::test]
async fn untouched_branches_are_shared() {
    let manager = StateManager::new(State::from(json!({
        "a": {"b": 1, "c": {"deep": true}},
        "settings": {"theme": "dark"},
        "list": [1, 2, 3]
    })));
    manager.register_action("SET_AB", |_ctx: ActionContext, _args: Args| async move {
        Ok::<_, ActionError>(UpdateMapping::new().set("a.b", 2)?)
    });
    let before = manager.get_state();

    manager.trigger("SET_AB", ()).await.expect("trigger");
    let after = manager.get_state();

    for key in ["settings", "list"] {
        assert!(State::same(
            before.get(key).expect("before"),
            after.get(key).expect("after")
        ));
    }
    let sibling = Path::parse("a.c").expect("valid path");
    assert!(State::same(
        before.get_path(&sibling).expect("before"),
        after.get_path(&sibling).expect("after")
    ));
    assert!(!State::same(
        before.get("a").expect("before"),
        after.get("a").expect("after")
    ));
}

#[tokio::test]
async fn multi_path_update_is_one_delivery() {
    let manager = StateManager::new(initial());
    manager.register_action("BOTH", count_and_id);
    let recorder = Arc::new(Recorder::default());
    let count_only = SliceSubscriber::shared();
    manager
        .attach_state(&recorder, ["count", "complex"])
        .attach_state(&count_only, ["count"]);

    manager.trigger("BOTH", ()).await.expect("trigger");

    let seen = recorder.seen.lock().clone();
    assert_eq!(seen.len(), 1);
    let slice = &seen[0];
    assert_eq!(slice.get("count").and_then(State::as_i64), Some(10));
    let id = Path::parse("arr.0.id").expect("valid path");
    assert_eq!(
        slice
            .get("complex")
            .and_then(|complex| complex.get_path(&id))
            .and_then(State::as_str),
        Some("X")
    );

    assert_eq!(count_only.deliveries(), 1);
    assert!(count_only.get("complex").is_none());
}

#[tokio::test]
async fn subscribers_of_other_keys_are_not_notified() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);
    let complex_view = SliceSubscriber::shared();
    manager.attach_state(&complex_view, ["complex"]);
    let seeded = complex_view.get("complex").expect("seeded");

    manager.trigger("PLUS", Args::one(1)).await.expect("trigger");
    assert_eq!(complex_view.deliveries(), 0);
    assert!(State::same(
        &seeded,
        &complex_view.get("complex").expect("still cached")
    ));
}

#[tokio::test]
async fn hijack_takes_precedence() {
    let manager = StateManager::new(initial());
    let normal_calls = Arc::new(AtomicUsize::new(0));
    let hijack_calls = Arc::new(AtomicUsize::new(0));

    let calls = Arc::clone(&normal_calls);
    manager.register_action("PLUS", move |_ctx: ActionContext, _args: Args| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, ActionError>(UpdateMapping::new().set("count", 99)?) }
    });
    let calls = Arc::clone(&hijack_calls);
    manager.hijack("PLUS", move |_ctx: ActionContext, args: Args| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            assert_eq!(args.get::<i64>(0)?, 5);
            Ok::<_, ActionError>(())
        }
    });
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["count"]);
    let before = manager.get_state();

    manager.trigger("PLUS", Args::one(5)).await.expect("trigger");

    assert_eq!(hijack_calls.load(Ordering::SeqCst), 1);
    assert_eq!(normal_calls.load(Ordering::SeqCst), 0);
    assert!(State::same(&before, &manager.get_state()));
    assert_eq!(view.deliveries(), 0);
}

#[tokio::test]
async fn hijack_registered_from_a_handler() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);
    manager.hijack("LOCK", |ctx: ActionContext, _args: Args| async move {
        ctx.hijack("PLUS", |_ctx: ActionContext, _args: Args| async move {
            Ok::<_, ActionError>(())
        });
        Ok::<_, ActionError>(())
    });

    manager.trigger("PLUS", Args::one(1)).await.expect("trigger");
    manager.trigger("LOCK", ()).await.expect("trigger");
    manager.trigger("PLUS", Args::one(1)).await.expect("trigger");

    assert!(manager.is_hijacked("PLUS"));
    assert_eq!(manager.get_state().get("count").and_then(State::as_i64), Some(1));
}

#[tokio::test]
async fn unknown_action_is_a_no_op() {
    let manager = StateManager::new(initial());
    let before = manager.get_state();

    manager
        .trigger("DOES_NOT_EXIST", Args::one(1))
        .await
        .expect("unknown actions resolve");
    assert!(State::same(&before, &manager.get_state()));
}

#[tokio::test]
async fn failing_handler_commits_nothing() {
    let manager = StateManager::new(initial());
    manager.register_action("FAIL", |_ctx: ActionContext, _args: Args| async move {
        Err::<UpdateMapping, _>(ActionError::custom_with_source(
            "backend unavailable",
            io::Error::other("connection refused"),
        ))
    });
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["count"]);
    let before = manager.get_state();

    let err = manager.trigger("FAIL", ()).await.expect_err("handler fails");
    assert!(err.is_handler_failure());
    assert!(State::same(&before, &manager.get_state()));
    assert_eq!(view.deliveries(), 0);
}

#[tokio::test]
async fn bad_argument_is_reported() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);

    assert_matches!(
        manager.trigger("PLUS", Args::one("ten")).await,
        Err(ActionError::Argument { index: 0, .. })
    );
    assert_matches!(
        manager.trigger("PLUS", ()).await,
        Err(ActionError::Argument { index: 0, .. })
    );
}

#[tokio::test]
async fn key_on_sequence_aborts_commit() {
    let manager = StateManager::new(initial());
    manager.register_action("BAD", |_ctx: ActionContext, _args: Args| async move {
        Ok::<_, ActionError>(
            UpdateMapping::new()
                .set("count", 1)?
                .set("complex.arr.first", 2)?,
        )
    });
    let before = manager.get_state();

    assert_matches!(
        manager.trigger("BAD", ()).await,
        Err(ActionError::Merge(MergeError::KeyOnSequence { position: 2, .. }))
    );
    assert!(State::same(&before, &manager.get_state()));
}

#[tokio::test]
async fn out_of_range_index_follows_policy() {
    let grow = |_ctx: ActionContext, _args: Args| async move {
        Ok::<_, ActionError>(UpdateMapping::new().set("complex.arr.3.id", 4)?)
    };

    let filling = StateManager::new(initial());
    filling.register_action("GROW", grow);
    filling.trigger("GROW", ()).await.expect("fill policy pads");
    assert_eq!(
        filling.get_state().get("complex").map(State::to_json),
        Some(json!({"arr": [{"id": 1}, null, null, {"id": 4}]}))
    );

    let strict = StateManager::from_config(
        ManagerConfig::new(initial()).with_index_policy(IndexPolicy::Reject),
    );
    strict.register_action("GROW", grow);
    assert_matches!(
        strict.trigger("GROW", ()).await,
        Err(ActionError::Merge(MergeError::IndexOutOfRange { index: 3, len: 1, .. }))
    );
}

#[tokio::test]
async fn later_paths_see_earlier_writes() {
    let manager = StateManager::new(State::object());
    manager.register_action("BUILD", |_ctx: ActionContext, _args: Args| async move {
        Ok::<_, ActionError>(
            UpdateMapping::new()
                .set("user", State::from(json!({"name": "Marge"})))?
                .set("user.age", 36)?
                .set("tags.0", "blue")?,
        )
    });

    manager.trigger("BUILD", ()).await.expect("trigger");
    assert_eq!(
        manager.get_state().to_json(),
        json!({"user": {"name": "Marge", "age": 36}, "tags": ["blue"]})
    );
}

#[tokio::test]
async fn json_handlers_ignore_malformed_results() {
    let manager = StateManager::new(initial());
    manager.register_action(
        "CHANGE_ID",
        JsonAction::new(|_ctx: ActionContext, args: Args| async move {
            let id: String = args.get(0)?;
            Ok::<_, ActionError>(json!({"complex.arr.0.id": id}))
        }),
    );
    manager.register_action(
        "NOT_A_MAPPING",
        JsonAction::new(|_ctx: ActionContext, _args: Args| async move {
            Ok::<_, ActionError>(json!(["count", 1]))
        }),
    );

    let before = manager.get_state();
    manager.trigger("NOT_A_MAPPING", ()).await.expect("ignored");
    assert!(State::same(&before, &manager.get_state()));

    manager
        .trigger("CHANGE_ID", Args::one("Bart"))
        .await
        .expect("trigger");
    let id = Path::parse("complex.arr.0.id").expect("valid path");
    assert_eq!(
        manager.get_state().get_path(&id).and_then(State::as_str),
        Some("Bart")
    );
}

#[tokio::test]
async fn subscriber_dispatches_through_bound_trigger() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["count"]);

    view.trigger("PLUS", Args::one(3)).await.expect("trigger");
    assert_eq!(view.get("count").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(view.deliveries(), 1);

    let mut updates = view.watch();
    view.trigger("PLUS", Args::one(4)).await.expect("trigger");
    assert!(updates.has_changed().expect("subscriber alive"));
    assert_eq!(
        updates.borrow_and_update().get("count").and_then(State::as_i64),
        Some(7)
    );
}

#[tokio::test]
async fn detached_subscriber_stops_receiving() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["count"]);

    manager.trigger("PLUS", Args::one(1)).await.expect("trigger");
    assert!(manager.detach(&view));
    manager.trigger("PLUS", Args::one(1)).await.expect("trigger");

    assert_eq!(view.deliveries(), 1);
    assert_eq!(view.get("count").and_then(|v| v.as_i64()), Some(1));
}

#[tokio::test]
async fn bound_trigger_fails_after_manager_drops() {
    let manager = StateManager::new(initial());
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["count"]);
    drop(manager);

    assert_matches!(
        view.trigger("PLUS", Args::one(1)).await,
        Err(ActionError::ManagerDropped)
    );
}

#[tokio::test]
async fn reattach_keeps_existing_slice_entries() {
    let manager = StateManager::new(State::from(json!({"a": 1, "b": 2})));
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["a"]);
    manager.attach_state(&view, ["b"]);

    assert_eq!(view.get("a").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(view.get("b").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(view.deliveries(), 0);
}

#[tokio::test]
async fn independent_managers_do_not_share_state() {
    let first = StateManager::new(initial());
    let second = StateManager::new(initial());
    first.register_action("PLUS", plus);
    second.register_action("PLUS", plus);

    first.trigger("PLUS", Args::one(1)).await.expect("trigger");
    second.trigger("PLUS", Args::one(5)).await.expect("trigger");

    assert_eq!(first.get_state().get("count").and_then(State::as_i64), Some(1));
    assert_eq!(second.get_state().get("count").and_then(State::as_i64), Some(5));
}

async fn slow_increment(ctx: ActionContext, _args: Args) -> ActionResult<UpdateMapping> {
    let count = ctx.get_state().get("count").and_then(State::as_i64).unwrap_or(0);
    tokio::task::yield_now().await;
    Ok(UpdateMapping::new().set("count", count + 1)?)
}

#[tokio::test]
async fn serialized_triggers_do_not_lose_updates() {
    let manager = StateManager::from_config(
        ManagerConfig::new(initial()).with_serialized_triggers(true),
    );
    manager.register_action("INC", slow_increment);
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["count"]);

    let calls = (0..10).map(|_| manager.trigger("INC", ()));
    for result in futures::future::join_all(calls).await {
        result.expect("trigger");
    }

    assert_eq!(manager.get_state().get("count").and_then(State::as_i64), Some(10));
    assert_eq!(view.get("count").and_then(|v| v.as_i64()), Some(10));
    assert_eq!(view.deliveries(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_commit_every_update() {
    let manager = StateManager::new(State::object());
    let view = SliceSubscriber::shared();
    manager.attach_state(&view, ["counters"]);

    let mut tasks = Vec::new();
    for n in 0..16_i64 {
        let manager = manager.clone();
        manager.register_action(
            format!("SET_{n}"),
            move |_ctx: ActionContext, _args: Args| async move {
                Ok::<_, ActionError>(UpdateMapping::new().set(format!("counters.c{n}"), n)?)
            },
        );
        tasks.push(tokio::spawn(async move {
            manager.trigger(&format!("SET_{n}"), ()).await
        }));
    }
    for task in tasks {
        task.await.expect("task").expect("trigger");
    }

    let counters = manager.get_state();
    let counters = counters.get("counters").expect("counters");
    assert_eq!(counters.as_object().map(|m| m.len()), Some(16));
    assert_eq!(view.deliveries(), 16);
    assert_eq!(view.get("counters").as_ref(), Some(counters));
}

/// Attaches a second subscriber the first time it receives an update.
struct Chaining {
    slice: Mutex<Slice>,
    manager: StateManager,
    late: Arc<SliceSubscriber>,
}

impl Subscriber for Chaining {
    fn slice(&self) -> Slice {
        self.slice.lock().clone()
    }

    fn set_slice(&self, slice: Slice) {
        *self.slice.lock() = slice;
        self.manager.attach_state(&self.late, ["count"]);
    }

    fn seed(&self, slice: Slice) {
        *self.slice.lock() = slice;
    }
}

#[tokio::test]
async fn subscriber_can_attach_during_delivery() {
    let manager = StateManager::new(initial());
    manager.register_action("PLUS", plus);
    let late = SliceSubscriber::shared();
    let chaining = Arc::new(Chaining {
        slice: Mutex::new(Slice::new()),
        manager: manager.clone(),
        late: Arc::clone(&late),
    });
    manager.attach_state(&chaining, ["count"]);

    manager.trigger("PLUS", Args::one(2)).await.expect("trigger");
    assert_eq!(late.get("count").and_then(|v| v.as_i64()), Some(2));

    manager.trigger("PLUS", Args::one(2)).await.expect("trigger");
    assert_eq!(late.get("count").and_then(|v| v.as_i64()), Some(4));
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_info() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[tokio::test]
async fn debug_mode_logs_states_around_actions() {
    let (captured, _guard) = capture_info();
    let manager = StateManager::from_config(
        ManagerConfig::new(State::from(json!({"count": 0}))).with_debug(true),
    );
    manager.register_action("PLUS", plus);
    manager.hijack("NOOP", |_ctx: ActionContext, _args: Args| async move {
        Ok::<_, ActionError>(())
    });

    manager.trigger("PLUS", Args::one(2)).await.expect("trigger");
    manager.trigger("NOOP", ()).await.expect("trigger");

    let logs = captured.text();
    assert!(logs.contains("applying action"), "{logs}");
    assert!(logs.contains(r#"prev_state={"count":0}"#), "{logs}");
    assert!(logs.contains("action applied"), "{logs}");
    assert!(logs.contains(r#"new_state={"count":2}"#), "{logs}");
    assert!(logs.contains("action hijacked"), "{logs}");
}

#[tokio::test]
async fn quiet_mode_logs_no_action_events() {
    let (captured, _guard) = capture_info();
    let manager = StateManager::new(State::from(json!({"count": 0})));
    manager.register_action("PLUS", plus);

    manager.trigger("PLUS", Args::one(2)).await.expect("trigger");

    let logs = captured.text();
    assert!(!logs.contains("applying action"), "{logs}");
    assert!(!logs.contains("action applied"), "{logs}");
}
