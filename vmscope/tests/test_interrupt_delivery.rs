//! Dual-path interrupt delivery: idle via the reactor loop, busy via the
//! host VM's safe-point mechanism.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use vmscope::domain::{ContextId, InterruptKind, ThreadId};
use vmscope::environment::{DeliveryState, EnvironmentRegistry};
use vmscope::reactor::ReactorLoop;
use vmscope::vm::VmHost;

const TICK: Duration = Duration::from_millis(50);

/// Host stub whose execution flag and safe-point queue the test drives.
struct StubVm {
    executing: AtomicBool,
    safepoints: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl StubVm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            executing: AtomicBool::new(false),
            safepoints: Mutex::new(Vec::new()),
        })
    }

    fn set_executing(&self, executing: bool) {
        self.executing.store(executing, Ordering::SeqCst);
    }

    /// Run everything queued for the next safe point, on the calling
    /// ("owning") thread. Returns how many requests fired.
    fn run_safepoints(&self) -> usize {
        let batch: Vec<_> = std::mem::take(&mut *self.safepoints.lock().unwrap());
        let count = batch.len();
        for request in batch {
            request();
        }
        count
    }
}

impl VmHost for StubVm {
    fn is_executing_guest(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    fn request_safepoint_interrupt(&self, f: Box<dyn FnOnce() + Send>) {
        self.safepoints.lock().unwrap().push(f);
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_concurrent_idle_interrupts_each_run_once_as_idle() {
    init_logger();
    let registry = EnvironmentRegistry::new();
    let mut reactor = ReactorLoop::new();
    let vm = StubVm::new();
    let env = registry.create(ContextId(1), vm, &mut reactor);

    let seen: Arc<Mutex<Vec<InterruptKind>>> = Arc::new(Mutex::new(Vec::new()));
    let producers: Vec<_> = (0..8)
        .map(|_| {
            let env = Arc::clone(&env);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                env.request_interrupt(move |_, kind| seen.lock().unwrap().push(kind));
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().len() < 8 && Instant::now() < deadline {
        reactor.run_once(TICK);
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 8, "every callback runs exactly once");
    assert!(seen.iter().all(|kind| *kind == InterruptKind::Idle));
    assert_eq!(env.delivery_state(), DeliveryState::Empty);
}

#[test]
fn test_busy_interrupts_deliver_at_next_safepoint() {
    init_logger();
    let registry = EnvironmentRegistry::new();
    let mut reactor = ReactorLoop::new();
    let vm = StubVm::new();
    let env = registry.create(ContextId(2), Arc::clone(&vm) as Arc<dyn VmHost>, &mut reactor);

    vm.set_executing(true);
    let seen: Arc<Mutex<Vec<InterruptKind>>> = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..3 {
        let seen = Arc::clone(&seen);
        env.request_interrupt(move |_, kind| seen.lock().unwrap().push(kind));
    }
    assert_eq!(env.pending_interrupts(), 3);
    assert_eq!(env.delivery_state(), DeliveryState::Pending);

    // One safe-point request per enqueue; the first drains the whole batch,
    // the redundant ones find an empty chain and do nothing.
    assert_eq!(vm.run_safepoints(), 3);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|kind| *kind == InterruptKind::Busy));
    assert_eq!(env.delivery_state(), DeliveryState::Empty);
}

#[test]
fn test_busy_batch_runs_lifo() {
    let registry = EnvironmentRegistry::new();
    let mut reactor = ReactorLoop::new();
    let vm = StubVm::new();
    let env = registry.create(ContextId(3), Arc::clone(&vm) as Arc<dyn VmHost>, &mut reactor);

    vm.set_executing(true);
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        env.request_interrupt(move |_, _| order.lock().unwrap().push(label));
    }
    vm.run_safepoints();

    // Batch order is LIFO: most recently enqueued runs first.
    assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
}

#[test]
fn test_callback_enqueued_during_drain_goes_to_next_batch() {
    let registry = EnvironmentRegistry::new();
    let mut reactor = ReactorLoop::new();
    let vm = StubVm::new();
    let env = registry.create(ContextId(4), Arc::clone(&vm) as Arc<dyn VmHost>, &mut reactor);

    vm.set_executing(true);
    let second_ran = Arc::new(AtomicBool::new(false));
    let flagged = Arc::clone(&second_ran);
    env.request_interrupt(move |env, _| {
        // Re-entrant enqueue from inside delivery: excluded from this drain.
        let flagged = Arc::clone(&flagged);
        env.request_interrupt(move |_, _| {
            flagged.store(true, Ordering::SeqCst);
        });
    });

    vm.run_safepoints();
    assert!(!second_ran.load(Ordering::SeqCst));
    assert_eq!(env.pending_interrupts(), 1);

    vm.run_safepoints();
    assert!(second_ran.load(Ordering::SeqCst));
    assert_eq!(env.delivery_state(), DeliveryState::Empty);
}

/// Scenario from the coordination contract: main thread, thread id 1, host
/// version "18.0.0"; an idle interrupt is observed exactly once, as Idle,
/// before a second request on the same chain returns.
#[test]
fn test_idle_scenario_on_main_thread() {
    init_logger();
    let registry = EnvironmentRegistry::new();
    let mut reactor = ReactorLoop::new();
    let env = registry.create(ContextId(5), StubVm::new(), &mut reactor);
    env.setup_environment_data(true, ThreadId(1.0), "18.0.0");

    let seen: Arc<Mutex<Vec<InterruptKind>>> = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&seen);
    env.request_interrupt(move |_, kind| observed.lock().unwrap().push(kind));

    let deadline = Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().is_empty() && Instant::now() < deadline {
        reactor.run_once(TICK);
    }
    assert_eq!(*seen.lock().unwrap(), vec![InterruptKind::Idle]);

    // The chain is drained; a further request is accepted immediately.
    env.request_interrupt(|_, _| {});
    assert_eq!(env.pending_interrupts(), 1);

    assert!(env.is_main_thread());
    assert_eq!(env.thread_id(), ThreadId(1.0));
    assert_eq!(env.host_version(), "18.0.0");
}
