//! GC hook registration: type filters, registration order, removal by
//! identity. The host VM drives invocation via `run_gc_prologue` /
//! `run_gc_epilogue`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vmscope::domain::ContextId;
use vmscope::environment::{EnvironmentData, EnvironmentRegistry};
use vmscope::reactor::ReactorLoop;
use vmscope::vm::VmHost;
use vmscope_common::GcType;

struct IdleVm;

impl VmHost for IdleVm {
    fn is_executing_guest(&self) -> bool {
        false
    }

    fn request_safepoint_interrupt(&self, _f: Box<dyn FnOnce() + Send>) {
        unreachable!("idle host never takes the safe-point path");
    }
}

fn make_env(context: u64) -> (Arc<EnvironmentRegistry>, ReactorLoop, Arc<EnvironmentData>) {
    let registry = EnvironmentRegistry::new();
    let mut reactor = ReactorLoop::new();
    let env = registry.create(ContextId(context), Arc::new(IdleVm), &mut reactor);
    (registry, reactor, env)
}

// Hooks are fn pointers (removal matches by identity), so observations go
// through statics scoped to each test.

static FULL_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn full_hook_a(_: &EnvironmentData, _: GcType) {
    FULL_ORDER.lock().unwrap().push("a");
}

fn full_hook_b(_: &EnvironmentData, _: GcType) {
    FULL_ORDER.lock().unwrap().push("b");
}

#[test]
fn test_full_collection_filter_and_registration_order() {
    let (_registry, _reactor, env) = make_env(20);
    env.add_gc_epilogue_callback(full_hook_a, GcType::MARK_SWEEP_COMPACT);
    env.add_gc_epilogue_callback(full_hook_b, GcType::MARK_SWEEP_COMPACT);

    // A minor cycle invokes neither.
    env.run_gc_epilogue(GcType::SCAVENGE);
    assert!(FULL_ORDER.lock().unwrap().is_empty());

    // A full cycle invokes both, in registration order.
    env.run_gc_epilogue(GcType::MARK_SWEEP_COMPACT);
    assert_eq!(*FULL_ORDER.lock().unwrap(), vec!["a", "b"]);
}

static REMOVED_HITS: AtomicUsize = AtomicUsize::new(0);

fn removable_hook(_: &EnvironmentData, _: GcType) {
    REMOVED_HITS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_add_then_remove_leaves_list_unchanged_and_silent() {
    let (_registry, _reactor, env) = make_env(21);
    let before = env.gc_epilogue_count();

    env.add_gc_epilogue_callback(removable_hook, GcType::ALL);
    env.remove_gc_epilogue_callback(removable_hook);
    assert_eq!(env.gc_epilogue_count(), before);

    env.run_gc_epilogue(GcType::MARK_SWEEP_COMPACT);
    env.run_gc_epilogue(GcType::SCAVENGE);
    assert_eq!(REMOVED_HITS.load(Ordering::SeqCst), 0);
}

static PROLOGUE_HITS: AtomicUsize = AtomicUsize::new(0);

fn prologue_hook(_: &EnvironmentData, _: GcType) {
    PROLOGUE_HITS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_prologue_all_filter_sees_every_cycle_kind() {
    let (_registry, _reactor, env) = make_env(22);
    env.add_gc_prologue_callback(prologue_hook, GcType::ALL);

    env.run_gc_prologue(GcType::SCAVENGE);
    env.run_gc_prologue(GcType::MARK_SWEEP_COMPACT);
    env.run_gc_prologue(GcType::INCREMENTAL_MARKING);
    assert_eq!(PROLOGUE_HITS.load(Ordering::SeqCst), 3);

    env.remove_gc_prologue_callback(prologue_hook);
    assert_eq!(env.gc_prologue_count(), 0);
}

static REENTRANT_SAW_ENV: AtomicUsize = AtomicUsize::new(0);

fn reentrant_hook(env: &EnvironmentData, _: GcType) {
    // A hook may inspect the container it fired on, but must stay prompt.
    if env.context_id() == ContextId(23) {
        REENTRANT_SAW_ENV.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_hook_receives_its_own_environment() {
    let (_registry, _reactor, env) = make_env(23);
    env.add_gc_epilogue_callback(reentrant_hook, GcType::ALL);
    env.run_gc_epilogue(GcType::WEAK_CALLBACKS);
    assert_eq!(REENTRANT_SAW_ENV.load(Ordering::SeqCst), 1);
}
