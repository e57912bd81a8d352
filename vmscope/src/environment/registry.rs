//! Environment registry: explicit create/lookup/teardown lifecycle.
//!
//! An [`EnvironmentRegistry`] owns every live [`EnvironmentData`] in the
//! process, keyed by context id. Initialization order is part of the
//! contract: `create` must run on a context's owning thread before any other
//! agent operation touches that context.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use log::info;

use crate::domain::ContextId;
use crate::reactor::ReactorLoop;
use crate::vm::VmHost;

use super::EnvironmentData;

thread_local! {
    /// Owning-thread fast path: warmed by `create`, cleared at teardown.
    /// Holds a `Weak` so a stale entry can never resurrect a released
    /// container.
    static CURRENT_ENV: RefCell<Weak<EnvironmentData>> = RefCell::new(Weak::new());
}

/// Process-wide lookup from context (or calling thread) to its environment.
pub struct EnvironmentRegistry {
    environments: Mutex<HashMap<ContextId, Arc<EnvironmentData>>>,
}

impl EnvironmentRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            environments: Mutex::new(HashMap::new()),
        })
    }

    /// Allocate and publish the environment for `context`.
    ///
    /// Runs on the calling (owning) thread: registers both wakeups on that
    /// thread's reactor loop, registers the teardown exit hook, and warms the
    /// thread-local cache.
    ///
    /// # Panics
    /// If an environment already exists for `context` — creating one twice
    /// is a programming error.
    pub fn create(
        self: &Arc<Self>,
        context: ContextId,
        vm: Arc<dyn VmHost>,
        reactor: &mut ReactorLoop,
    ) -> Arc<EnvironmentData> {
        {
            let map = self.environments.lock().expect("registry lock poisoned");
            assert!(
                !map.contains_key(&context),
                "environment already created for {context}"
            );
        }

        let env = EnvironmentData::new(context, vm, reactor);
        self.environments
            .lock()
            .expect("registry lock poisoned")
            .insert(context, Arc::clone(&env));
        CURRENT_ENV.with(|cell| *cell.borrow_mut() = Arc::downgrade(&env));

        let registry = Arc::clone(self);
        let teardown = Arc::clone(&env);
        reactor.register_exit_hook(move || teardown.begin_teardown(&registry));

        info!("created environment for {context}");
        env
    }

    /// Environment bound to the calling thread.
    ///
    /// # Panics
    /// If `create` never ran on this thread — a precondition violation, not
    /// a recoverable error.
    #[must_use]
    pub fn get_current(&self) -> Arc<EnvironmentData> {
        self.try_get_current()
            .expect("no environment for this thread; EnvironmentRegistry::create must run first")
    }

    /// Lock-free, allocation-free lookup for the calling thread, returning
    /// `None` instead of failing.
    ///
    /// The only safe variant from reentrant or signal-unsafe positions:
    /// inside a GC hook, or inside interrupt delivery itself.
    #[must_use]
    pub fn try_get_current(&self) -> Option<Arc<EnvironmentData>> {
        CURRENT_ENV.with(|cell| cell.borrow().upgrade())
    }

    /// Cross-thread lookup by context id, for producers that do not own the
    /// context.
    #[must_use]
    pub fn get(&self, context: ContextId) -> Option<Arc<EnvironmentData>> {
        self.environments
            .lock()
            .expect("registry lock poisoned")
            .get(&context)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, context: ContextId) -> bool {
        self.environments
            .lock()
            .expect("registry lock poisoned")
            .contains_key(&context)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.environments.lock().expect("registry lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release ownership of a fully-closed environment. Only the close
    /// confirmation that exhausts the countdown reaches here; it runs on the
    /// owning thread, so the thread-local cache can be cleared in place.
    pub(crate) fn finalize(&self, context: ContextId) {
        let removed = self
            .environments
            .lock()
            .expect("registry lock poisoned")
            .remove(&context);
        if removed.is_some() {
            info!("destroyed environment for {context}");
        }
        CURRENT_ENV.with(|cell| {
            let mut current = cell.borrow_mut();
            let points_here = current
                .upgrade()
                .is_none_or(|env| env.context_id() == context);
            if points_here {
                *current = Weak::new();
            }
        });
    }
}
