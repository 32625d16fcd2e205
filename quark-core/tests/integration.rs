//! Integration Tests for Atoms and Structures
//!
//! These tests verify that atoms, structures, views and observers work
//! together the way a host framework would drive them.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use quark_core::reactive::{Atom, ExternalStore, Observer, Subscriber};
use quark_core::structure::{Structure, ViewState};
use quark_core::StructureError;

/// The single-atom lifecycle: read, change, repeat the same write.
#[test]
fn atom_end_to_end() {
    let x = Atom::new(10);
    assert_eq!(x.get(), 10);

    let calls = Arc::new(AtomicI32::new(0));
    let calls_clone = calls.clone();
    let _sub = x.subscribe_fn(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    x.set(20);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(x.get(), 20);

    x.set(20);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Snapshot, patch, snapshot again.
#[test]
fn structure_end_to_end() {
    let n = Atom::new(String::from("A"));
    let first = Atom::new(1);
    let second = Atom::new(2);

    let s = Structure::map([
        ("n", Structure::leaf(&n)),
        ("list", Structure::list([Structure::leaf(&first), Structure::leaf(&second)])),
    ]);

    assert_eq!(s.snapshot().unwrap(), json!({"n": "A", "list": [1, 2]}));

    s.assign(&json!({"n": "B"})).unwrap();
    assert_eq!(s.snapshot().unwrap(), json!({"n": "B", "list": [1, 2]}));
}

/// Walker snapshots are fresh allocations; view snapshots are shared
/// between notifications.
#[test]
fn snapshot_isolation() {
    let a = Atom::new(vec![1, 2, 3]);
    let s = Structure::map([("a", Structure::leaf(&a))]);

    let mut first = s.snapshot().unwrap();
    let second = s.snapshot().unwrap();
    assert_eq!(first, second);

    // Editing one walker snapshot affects neither the other nor the atom.
    first["a"][0] = json!(100);
    assert_eq!(second, json!({"a": [1, 2, 3]}));
    assert_eq!(a.get(), vec![1, 2, 3]);

    let view = s.view();
    let _sub = view.subscribe_fn(|| {});
    let cached = view.snapshot().unwrap();
    assert!(Arc::ptr_eq(&cached, &view.snapshot().unwrap()));

    a.mutate(|v| v.clear());
    let refreshed = view.snapshot().unwrap();
    assert!(!Arc::ptr_eq(&cached, &refreshed));
    assert_eq!(*refreshed, json!({"a": []}));
}

/// The view's initial snapshot reflects the atoms' creation values no
/// matter what happens afterwards.
#[test]
fn initial_snapshot_stability() {
    let name = Atom::new(String::from("John"));
    let age = Atom::new(25);
    let view = Structure::map([(
        "user",
        Structure::map([("name", Structure::leaf(&name)), ("age", Structure::leaf(&age))]),
    )])
    .view();

    let initial = view.initial_snapshot().unwrap();

    view.structure().assign(&json!({"user": {"age": 26}})).unwrap();
    name.mutate(|n| n.push_str(" Doe"));

    assert_eq!(*view.initial_snapshot().unwrap(), json!({"user": {"name": "John", "age": 25}}));
    assert!(Arc::ptr_eq(&initial, &view.initial_snapshot().unwrap()));
    assert_eq!(*view.snapshot().unwrap(), json!({"user": {"name": "John Doe", "age": 26}}));
}

/// A listener that unsubscribes another listener during a notification
/// pass keeps it from ever being called again.
#[test]
fn unsubscribe_from_inside_listener() {
    let atom = Atom::new(0);
    let victim_calls = Arc::new(AtomicI32::new(0));

    let victim_calls_clone = victim_calls.clone();
    let victim = Subscriber::new(move || {
        victim_calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    let victim_id = victim.id();

    let atom_clone = atom.clone();
    let _killer = atom.subscribe_fn(move || {
        atom_clone.unsubscribe(victim_id);
    });
    let _victim_sub = atom.subscribe(victim);

    atom.set(1);
    atom.set(2);
    assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
    assert_eq!(atom.listener_count(), 1);
}

/// A listener that writes to another atom triggers a nested, synchronous
/// notification that completes before the outer `set` returns.
#[test]
fn nested_notification_is_synchronous() {
    let celsius = Atom::new(0.0_f64);
    let fahrenheit = Atom::new(32.0_f64);
    let log = Arc::new(Mutex::new(Vec::new()));

    let log_clone = log.clone();
    let fahrenheit_clone = fahrenheit.clone();
    let _f_sub = fahrenheit.subscribe_fn(move || {
        log_clone.lock().push(format!("F={}", fahrenheit_clone.get()));
    });

    let log_clone = log.clone();
    let celsius_clone = celsius.clone();
    let fahrenheit_clone = fahrenheit.clone();
    let _c_sub = celsius.subscribe_fn(move || {
        let c = celsius_clone.get();
        log_clone.lock().push(format!("C={c}"));
        fahrenheit_clone.set(c * 9.0 / 5.0 + 32.0);
    });

    celsius.set(100.0);
    assert_eq!(*log.lock(), vec!["C=100", "F=212"]);
}

/// A host-style integration: an observer renders from a structure view and
/// re-renders once per change.
#[test]
fn observer_renders_structure_view() {
    let title = Atom::new(String::from("Todo"));
    let items = Atom::new(vec![String::from("write tests")]);
    let view = Structure::map([("title", Structure::leaf(&title)), ("items", Structure::leaf(&items))]).view();

    let renders = Arc::new(Mutex::new(Vec::new()));
    let renders_clone = renders.clone();
    let view_clone = view.clone();
    let observer = Observer::new(move || {
        let snapshot = view_clone.use_snapshot().unwrap();
        renders_clone.lock().push(serde_json::to_string(&*snapshot).unwrap());
    });

    items.mutate(|list| list.push(String::from("ship it")));
    title.set(String::from("Done"));
    title.set(String::from("Done"));

    assert_eq!(observer.run_count(), 3);
    assert_eq!(
        *renders.lock(),
        vec![
            r#"{"title":"Todo","items":["write tests"]}"#,
            r#"{"title":"Todo","items":["write tests","ship it"]}"#,
            r#"{"title":"Done","items":["write tests","ship it"]}"#,
        ]
    );

    observer.dispose();
    title.set(String::from("Archived"));
    assert_eq!(renders.lock().len(), 3);
    assert_eq!(title.listener_count(), 0);
    assert_eq!(items.listener_count(), 0);
}

/// Two hosts subscribed to one view both read the snapshot they were
/// notified about, and it stays the same object until the next change.
#[test]
fn view_snapshot_is_shared_by_all_hosts() {
    let a = Atom::new(1);
    let view = Structure::map([("a", Structure::leaf(&a))]).view();

    let delivered = Arc::new(Mutex::new(None));
    let delivered_clone = delivered.clone();
    let view_clone = view.clone();
    let _first = view.subscribe_fn(move || {
        *delivered_clone.lock() = Some(view_clone.snapshot().unwrap());
    });
    let _second = view.subscribe_fn(|| {});

    a.set(2);

    let delivered = delivered.lock().clone().unwrap();
    assert!(Arc::ptr_eq(&delivered, &view.snapshot().unwrap()));
    assert_eq!(*delivered, json!({"a": 2}));
}

/// The external-store contract is usable generically.
#[test]
fn external_store_is_generic() {
    fn read_both<S: ExternalStore>(store: &S) -> (S::Snapshot, S::Snapshot) {
        (store.snapshot(), store.initial_snapshot())
    }

    let atom = Atom::new(1);
    atom.set(2);
    assert_eq!(read_both(&atom), (2, 1));

    let view = Structure::list([Structure::leaf(&atom)]).view();
    let (current, initial) = read_both(&view);
    assert_eq!(*current.unwrap(), json!([2]));
    assert_eq!(*initial.unwrap(), json!([1]));
}

/// The view's subscription state follows its subscribers.
#[test]
fn view_state_machine() {
    let atom = Atom::new(1);
    let view = Structure::list([Structure::leaf(&atom)]).view();
    assert_eq!(view.state(), ViewState::Unsubscribed);

    let first = view.subscribe_fn(|| {});
    let second = view.subscribe_fn(|| {});
    assert_eq!(view.state(), ViewState::Subscribed);

    drop(first);
    assert_eq!(view.state(), ViewState::Subscribed);

    second.unsubscribe();
    assert_eq!(view.state(), ViewState::Unsubscribed);
    assert_eq!(atom.listener_count(), 0);

    // Re-entering Subscribed is always valid.
    let calls = Arc::new(AtomicI32::new(0));
    let calls_clone = calls.clone();
    let _third = view.subscribe_fn(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    atom.set(2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Bad patches fail fast and leave every atom alone.
#[test]
fn invalid_patch_changes_nothing() {
    let a = Atom::new(1);
    let b = Atom::new(String::from("b"));
    let s = Structure::map([("a", Structure::leaf(&a)), ("nested", Structure::map([("b", Structure::leaf(&b))]))]);

    let err = s.assign(&json!({"a": 2, "nested": "flat"})).unwrap_err();
    assert!(matches!(err, StructureError::ShapeMismatch { .. }));
    assert_eq!(err.to_string(), "shape mismatch at $.nested: expected object, found string");

    assert_eq!(a.get(), 1);
    assert_eq!(b.get(), "b");
}

/// Atoms can be shared across threads; notifications run on the writing
/// thread.
#[test]
fn atoms_are_thread_safe() {
    let counter = Atom::new(0);
    let calls = Arc::new(AtomicI32::new(0));

    let calls_clone = calls.clone();
    let _sub = counter.subscribe_fn(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    counter.mutate(|v| *v += 1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.get(), 1000);
    assert_eq!(calls.load(Ordering::SeqCst), 1000);
}
