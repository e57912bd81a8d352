//! # vmscope - In-Process Profiling Agent Core
//!
//! vmscope is the cross-thread coordination core of a profiling agent
//! embedded in a multi-context managed-language VM. Each worker thread owns
//! one execution context; other threads need to request work on that
//! context's owning thread — run an interrupt, collect statistics, react to
//! GC events — without corrupting running guest code.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Producer Threads                           │
//! │        request_interrupt() / send_collect_statistics()          │
//! └──────────────┬─────────────────────────────┬────────────────────┘
//!                │ enqueue + pick path         │ trigger (coalesced)
//!                ▼                             ▼
//! ┌──────────────────────────┐   ┌─────────────────────────────────┐
//! │   Host VM (safe point)   │   │  ReactorLoop (owning thread)    │
//! │   busy path: guest code  │   │  idle path: next iteration      │
//! │   pauses for callback    │   │  + statistics single-flight     │
//! └──────────────┬───────────┘   └──────────────┬──────────────────┘
//!                │ drain (kBusy)                │ drain (kIdle)
//!                ▼                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  EnvironmentData (one per context, owned by the registry)      │
//! │  interrupt chain · GC hook lists · statistics · config          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`environment`]: the per-context container and its registry
//!   - `EnvironmentData`: interrupt chain, GC hook lists, owned statistics
//!     and configuration, teardown countdown
//!   - `EnvironmentRegistry`: explicit create/lookup/teardown lifecycle with
//!     a lock-free thread-local fast path (`try_get_current`)
//!
//! - [`reactor`]: per-thread loop + cross-thread `WakeupSignal` handles with
//!   coalescing triggers and asynchronous, confirmed closes
//!
//! - [`vm`]: the capability surface the host runtime provides ("is guest
//!   code executing?" / "run this at the next safe point")
//!
//! - [`domain`]: identity newtypes (`ContextId`, `ThreadId`),
//!   `InterruptKind`, structured errors
//!
//! Plain data shared with external collaborators (statistics structures, GC
//! type bitmask, dump actions) lives in the `vmscope-common` crate.
//!
//! ## Key Guarantees
//!
//! - Every requested interrupt runs exactly once, on the owning thread, with
//!   the kind of whichever path delivered it; redundant path firings drain
//!   an empty chain as a no-op.
//! - Statistics triggers coalesce: K triggers within one loop iteration
//!   produce one collection pass.
//! - The container is destroyed only after both wakeup handles confirm their
//!   close, never while a handler is in flight.
//!
//! ## Typical Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use vmscope::domain::{ContextId, ThreadId};
//! use vmscope::environment::EnvironmentRegistry;
//! use vmscope::reactor::ReactorLoop;
//! use vmscope::vm::VmHost;
//!
//! fn attach(vm: Arc<dyn VmHost>) {
//!     // On the context's owning thread:
//!     let registry = EnvironmentRegistry::new();
//!     let mut reactor = ReactorLoop::new();
//!     let env = registry.create(ContextId(1), vm, &mut reactor);
//!     env.setup_environment_data(true, ThreadId(0.0), "18.0.0");
//!
//!     // Any thread may now request work on the owning thread:
//!     env.request_interrupt(|env, kind| {
//!         let _ = (env.uptime(), kind);
//!     });
//!
//!     // Owning thread keeps the loop running; shutdown tears down safely.
//!     reactor.run_once(std::time::Duration::from_millis(10));
//!     reactor.shutdown();
//! }
//! ```

pub mod domain;
pub mod environment;
pub mod reactor;
pub mod vm;
