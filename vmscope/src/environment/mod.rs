//! # Per-context environment container
//!
//! One [`EnvironmentData`] exists per execution context, bound 1:1 to the
//! context's owning thread. It is the only genuine shared-mutation boundary
//! in the agent: foreign threads enqueue interrupts and trigger statistics
//! collection; the owning thread drains, collects, and runs GC hooks.
//!
//! ## Cross-thread contract
//!
//! - [`EnvironmentData::request_interrupt`] and
//!   [`EnvironmentData::send_collect_statistics`] are non-blocking
//!   fire-and-continue, callable from any thread.
//! - Delivery always happens on the owning thread: at a VM safe point while
//!   guest code runs (busy path), or on the next reactor iteration while the
//!   context is idle.
//! - Teardown never locks out in-flight callbacks; it closes both wakeup
//!   handles and releases the container only after both closes are
//!   confirmed (see [`CloseProgress`]).

mod close;
mod gc_hooks;
mod interrupt;
mod registry;

pub use close::CloseProgress;
pub use gc_hooks::GcCallback;
pub use interrupt::{DeliveryState, InterruptCallback};
pub use registry::EnvironmentRegistry;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use vmscope_common::{
    ActionMap, GcStatistics, GcType, HandleStatistics, HttpStatistics, MemoryStatistics,
};

use crate::domain::{ContextId, InterruptKind, ThreadId};
use crate::reactor::{ReactorLoop, WakeupSignal};
use crate::vm::VmHost;

use close::CloseCountdown;
use gc_hooks::GcHookList;
use interrupt::InterruptChain;

/// Identity fields set exactly once by `setup_environment_data`.
struct Identity {
    is_main_thread: bool,
    thread_id: ThreadId,
    host_version: String,
}

/// Output file paths for the dump pipeline, written by external command
/// handlers.
#[derive(Debug, Default, Clone)]
pub struct ProfilePaths {
    pub cpu_profile: PathBuf,
    pub sampling_heap_profile: PathBuf,
    pub heap_snapshot: PathBuf,
    pub gc_profile: PathBuf,
    pub diagnostic_report: PathBuf,
    pub core_dump: PathBuf,
}

type StatisticsHandler = Arc<dyn Fn(&EnvironmentData) + Send + Sync>;

/// Per-context profiling state container.
pub struct EnvironmentData {
    context: ContextId,
    vm: Arc<dyn VmHost>,
    self_weak: Weak<EnvironmentData>,
    time_origin: Instant,
    identity: OnceLock<Identity>,

    interrupt_chain: Mutex<InterruptChain>,
    interrupt_signal: WakeupSignal,
    statistics_signal: WakeupSignal,
    statistics_handler: Mutex<Option<StatisticsHandler>>,
    close_countdown: CloseCountdown,

    gc_prologue_hooks: Mutex<GcHookList>,
    gc_epilogue_hooks: Mutex<GcHookList>,

    gc_statistics: Mutex<GcStatistics>,
    memory_statistics: Mutex<MemoryStatistics>,
    http_statistics: Mutex<HttpStatistics>,
    handle_statistics: Mutex<HandleStatistics>,

    action_map: Mutex<ActionMap>,
    profile_paths: Mutex<ProfilePaths>,
}

impl EnvironmentData {
    /// Wakeup handles whose close must be confirmed before the container may
    /// be destroyed (statistics + interrupt).
    pub const HANDLE_COUNT: u32 = 2;

    /// Allocate the container and register its two wakeups on the owning
    /// thread's reactor loop. Called by [`EnvironmentRegistry::create`].
    pub(crate) fn new(
        context: ContextId,
        vm: Arc<dyn VmHost>,
        reactor: &mut ReactorLoop,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<EnvironmentData>| {
            let env = weak.clone();
            let statistics_signal = reactor.register_wakeup(move || {
                if let Some(env) = env.upgrade() {
                    env.collect_statistics();
                }
            });
            let env = weak.clone();
            let interrupt_signal = reactor.register_wakeup(move || {
                if let Some(env) = env.upgrade() {
                    env.drain_interrupts(InterruptKind::Idle);
                }
            });
            EnvironmentData {
                context,
                vm,
                self_weak: weak.clone(),
                time_origin: Instant::now(),
                identity: OnceLock::new(),
                interrupt_chain: Mutex::new(InterruptChain::new()),
                interrupt_signal,
                statistics_signal,
                statistics_handler: Mutex::new(None),
                close_countdown: CloseCountdown::new(Self::HANDLE_COUNT),
                gc_prologue_hooks: Mutex::new(GcHookList::new()),
                gc_epilogue_hooks: Mutex::new(GcHookList::new()),
                gc_statistics: Mutex::new(GcStatistics::default()),
                memory_statistics: Mutex::new(MemoryStatistics::default()),
                http_statistics: Mutex::new(HttpStatistics::default()),
                handle_statistics: Mutex::new(HandleStatistics::default()),
                action_map: Mutex::new(ActionMap::new()),
                profile_paths: Mutex::new(ProfilePaths::default()),
            }
        })
    }

    // ========================================================================
    // Interrupt delivery (dual-path)
    // ========================================================================

    /// Enqueue `callback` to run on the owning thread, from any thread.
    ///
    /// Delivery takes exactly one of two paths, chosen by asking the host
    /// whether guest code is executing right now: at the next VM safe point
    /// (busy), or on the next reactor iteration (idle). Within one drained
    /// batch, callbacks run in LIFO order — the most recently enqueued first.
    pub fn request_interrupt<F>(&self, callback: F)
    where
        F: FnOnce(&EnvironmentData, InterruptKind) + Send + 'static,
    {
        self.interrupt_chain
            .lock()
            .expect("interrupt chain lock poisoned")
            .push(Box::new(callback));

        if self.vm.is_executing_guest() {
            let env = self.self_weak.clone();
            self.vm.request_safepoint_interrupt(Box::new(move || {
                if let Some(env) = env.upgrade() {
                    env.drain_interrupts(InterruptKind::Busy);
                }
            }));
        } else if let Err(err) = self.interrupt_signal.trigger() {
            // Teardown already began; the chain will not drain again.
            warn!("{}: interrupt signal not delivered: {err}", self.context);
        }
    }

    /// Detach the whole pending batch and run every callback exactly once.
    ///
    /// Safe to fire redundantly: a drain after the chain has been emptied is
    /// a no-op. Callbacks enqueued while the batch runs go to the next drain.
    pub(crate) fn drain_interrupts(&self, kind: InterruptKind) {
        let batch = self
            .interrupt_chain
            .lock()
            .expect("interrupt chain lock poisoned")
            .take_batch();
        if batch.is_empty() {
            return;
        }
        debug!("{}: draining {} interrupt(s) as {kind:?}", self.context, batch.len());
        // LIFO within the batch: the chain is built by prepending.
        for callback in batch.into_iter().rev() {
            callback(self, kind);
        }
        self.interrupt_chain
            .lock()
            .expect("interrupt chain lock poisoned")
            .finish_drain();
    }

    /// Delivery state of the interrupt chain.
    #[must_use]
    pub fn delivery_state(&self) -> DeliveryState {
        self.interrupt_chain
            .lock()
            .expect("interrupt chain lock poisoned")
            .state()
    }

    /// Callbacks currently queued and not yet detached for delivery.
    #[must_use]
    pub fn pending_interrupts(&self) -> usize {
        self.interrupt_chain
            .lock()
            .expect("interrupt chain lock poisoned")
            .len()
    }

    // ========================================================================
    // Statistics collection trigger
    // ========================================================================

    /// Trigger a statistics collection pass on the owning thread, from any
    /// thread. Triggers within one reactor iteration coalesce into a single
    /// invocation of the registered collection routine.
    pub fn send_collect_statistics(&self) {
        if let Err(err) = self.statistics_signal.trigger() {
            warn!("{}: statistics signal not delivered: {err}", self.context);
        }
    }

    /// Register the external collection routine invoked by the statistics
    /// wakeup. The routine snapshots/exports the statistics structures; the
    /// agent only guarantees the single-flight invocation contract.
    pub fn set_statistics_handler<F>(&self, handler: F)
    where
        F: Fn(&EnvironmentData) + Send + Sync + 'static,
    {
        *self
            .statistics_handler
            .lock()
            .expect("statistics handler lock poisoned") = Some(Arc::new(handler));
    }

    fn collect_statistics(&self) {
        let handler = self
            .statistics_handler
            .lock()
            .expect("statistics handler lock poisoned")
            .clone();
        if let Some(handler) = handler {
            handler(self);
        }
    }

    // ========================================================================
    // GC hooks
    // ========================================================================

    /// Register a callback fired right before GC cycles matching `filter`.
    pub fn add_gc_prologue_callback(&self, callback: GcCallback, filter: GcType) {
        self.gc_prologue_hooks
            .lock()
            .expect("gc hook lock poisoned")
            .add(callback, filter);
    }

    /// Unregister a prologue callback by identity.
    pub fn remove_gc_prologue_callback(&self, callback: GcCallback) {
        self.gc_prologue_hooks
            .lock()
            .expect("gc hook lock poisoned")
            .remove(callback);
    }

    /// Register a callback fired right after GC cycles matching `filter`.
    pub fn add_gc_epilogue_callback(&self, callback: GcCallback, filter: GcType) {
        self.gc_epilogue_hooks
            .lock()
            .expect("gc hook lock poisoned")
            .add(callback, filter);
    }

    /// Unregister an epilogue callback by identity.
    pub fn remove_gc_epilogue_callback(&self, callback: GcCallback) {
        self.gc_epilogue_hooks
            .lock()
            .expect("gc hook lock poisoned")
            .remove(callback);
    }

    /// Invoked by the host VM at the start of a GC cycle. Fires matching
    /// hooks in registration order, outside the list lock.
    pub fn run_gc_prologue(&self, gc_type: GcType) {
        let hooks = self
            .gc_prologue_hooks
            .lock()
            .expect("gc hook lock poisoned")
            .snapshot();
        for (callback, filter) in hooks {
            if filter.matches(gc_type) {
                callback(self, gc_type);
            }
        }
    }

    /// Invoked by the host VM at the end of a GC cycle.
    pub fn run_gc_epilogue(&self, gc_type: GcType) {
        let hooks = self
            .gc_epilogue_hooks
            .lock()
            .expect("gc hook lock poisoned")
            .snapshot();
        for (callback, filter) in hooks {
            if filter.matches(gc_type) {
                callback(self, gc_type);
            }
        }
    }

    #[must_use]
    pub fn gc_prologue_count(&self) -> usize {
        self.gc_prologue_hooks.lock().expect("gc hook lock poisoned").len()
    }

    #[must_use]
    pub fn gc_epilogue_count(&self) -> usize {
        self.gc_epilogue_hooks.lock().expect("gc hook lock poisoned").len()
    }

    // ========================================================================
    // Identity and accessors
    // ========================================================================

    /// Materialize the guest-visible identity of this environment.
    ///
    /// The sole call by which guest-level setup fills in who owns this
    /// context; must run exactly once per thread.
    ///
    /// # Panics
    /// If the identity was already set (programming error).
    pub fn setup_environment_data(
        &self,
        is_main_thread: bool,
        thread_id: ThreadId,
        host_version: impl Into<String>,
    ) {
        let set = self
            .identity
            .set(Identity {
                is_main_thread,
                thread_id,
                host_version: host_version.into(),
            })
            .is_ok();
        assert!(set, "environment identity already set for {}", self.context);
        debug!("{}: identity set ({})", self.context, thread_id);
    }

    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub fn is_main_thread(&self) -> bool {
        self.identity.get().is_some_and(|i| i.is_main_thread)
    }

    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.identity
            .get()
            .map_or(ThreadId::UNASSIGNED, |i| i.thread_id)
    }

    #[must_use]
    pub fn host_version(&self) -> String {
        self.identity
            .get()
            .map_or_else(String::new, |i| i.host_version.clone())
    }

    /// Time since this environment was created. Monotonically non-decreasing
    /// for the lifetime of the container.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.time_origin.elapsed()
    }

    // ========================================================================
    // Statistics and configuration surfaces
    // ========================================================================

    #[must_use]
    pub fn gc_statistics(&self) -> &Mutex<GcStatistics> {
        &self.gc_statistics
    }

    #[must_use]
    pub fn memory_statistics(&self) -> &Mutex<MemoryStatistics> {
        &self.memory_statistics
    }

    #[must_use]
    pub fn http_statistics(&self) -> &Mutex<HttpStatistics> {
        &self.http_statistics
    }

    #[must_use]
    pub fn handle_statistics(&self) -> &Mutex<HandleStatistics> {
        &self.handle_statistics
    }

    #[must_use]
    pub fn action_map(&self) -> &Mutex<ActionMap> {
        &self.action_map
    }

    #[must_use]
    pub fn profile_paths(&self) -> &Mutex<ProfilePaths> {
        &self.profile_paths
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Begin teardown from the owning thread's exit hook: close both wakeup
    /// handles and let their confirmations drive the countdown. Pending
    /// interrupts are not cancelled; anything already in flight finishes
    /// before the container is released.
    pub(crate) fn begin_teardown(self: &Arc<Self>, registry: &Arc<EnvironmentRegistry>) {
        info!("{}: teardown started", self.context);
        for signal in [&self.statistics_signal, &self.interrupt_signal] {
            let env = Arc::clone(self);
            let reg = Arc::clone(registry);
            if let Err(err) = signal.close(move || env.confirm_handle_closed(&reg)) {
                warn!("{}: wakeup close failed: {err}", self.context);
            }
        }
    }

    /// One wakeup handle confirmed closed. The confirmation that exhausts
    /// the countdown releases the container from the registry; no other path
    /// may do so earlier.
    fn confirm_handle_closed(&self, registry: &Arc<EnvironmentRegistry>) {
        let last = self.close_countdown.confirm();
        debug!("{}: wakeup handle closed (last: {last})", self.context);
        if last {
            registry.finalize(self.context);
        }
    }

    /// Teardown progress of this container.
    #[must_use]
    pub fn close_progress(&self) -> CloseProgress {
        self.close_countdown.progress()
    }
}
