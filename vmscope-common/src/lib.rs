//! # Shared Data Types (agent core ↔ collaborators)
//!
//! Defines the plain data that crosses the boundary between the vmscope agent
//! core and its external collaborators: the statistics collectors that
//! populate these structures, the dump/report pipeline that reads them, and
//! the host VM that fires GC boundary notifications.
//!
//! The agent core itself never interprets any of this — it only stores the
//! statistics, keeps the action map, and checks `GcType` filters.
//!
//! ## Key Types
//!
//! - [`GcType`] - Bitmask identifying (or filtering) GC cycle kinds
//! - [`GcStatistics`], [`MemoryStatistics`], [`HttpStatistics`],
//!   [`HandleStatistics`] - Collector-owned figures stored per context
//! - [`DumpAction`] / [`ActionMap`] - Which dump actions are currently running

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// GC cycle types
// ============================================================================

/// Bitmask of GC cycle kinds, used both to tag a fired GC cycle and to filter
/// which cycles a registered hook wants to see.
///
/// Values follow the host VM's own GC-type taxonomy, so a fired type can be
/// matched against a filter with a plain bitwise AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcType(pub u32);

impl GcType {
    /// Young-generation collection
    pub const SCAVENGE: GcType = GcType(1);
    /// Full mark-sweep-compact collection
    pub const MARK_SWEEP_COMPACT: GcType = GcType(1 << 1);
    /// Incremental marking step
    pub const INCREMENTAL_MARKING: GcType = GcType(1 << 2);
    /// Weak callback processing phase
    pub const WEAK_CALLBACKS: GcType = GcType(1 << 3);
    /// Matches every cycle kind (the default filter)
    pub const ALL: GcType = GcType(0b1111);

    /// Whether a fired cycle type passes this filter.
    #[must_use]
    pub fn matches(self, fired: GcType) -> bool {
        self.0 & fired.0 != 0
    }
}

impl std::ops::BitOr for GcType {
    type Output = GcType;

    fn bitor(self, rhs: GcType) -> GcType {
        GcType(self.0 | rhs.0)
    }
}

// ============================================================================
// Statistics structures
// ============================================================================

/// GC pause accounting, populated by the GC statistics collector.
///
/// Durations are cumulative milliseconds since environment creation, broken
/// down by cycle kind so the reporter can derive per-kind averages.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GcStatistics {
    /// Total number of completed GC cycles
    pub total_gc_times: u64,
    /// Total milliseconds spent paused in GC
    pub total_gc_duration: u64,
    /// Milliseconds spent in scavenge (young generation) cycles
    pub total_scavenge_duration: u64,
    /// Milliseconds spent in mark-sweep-compact cycles
    pub total_marksweep_duration: u64,
    /// Milliseconds spent in incremental marking steps
    pub total_incremental_marking_duration: u64,
    /// Milliseconds spent in GC since the last statistics record
    pub gc_time_during_last_record: u64,
}

/// Process and heap memory figures, populated by the memory collector.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryStatistics {
    /// Resident set size in bytes
    pub rss: u64,
    /// Total heap reserved by the VM, bytes
    pub heap_total: u64,
    /// Heap actually in use, bytes
    pub heap_used: u64,
    /// Hard heap size limit, bytes
    pub heap_limit: u64,
    /// Memory owned by off-heap (external) allocations, bytes
    pub external: u64,
    /// Memory backing array buffers, bytes
    pub array_buffers: u64,
}

/// HTTP server throughput counters, populated by the HTTP collector.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HttpStatistics {
    /// Requests currently in flight
    pub live_http_request: u64,
    /// Responses finished normally
    pub http_response_sent: u64,
    /// Responses whose connection closed before completion
    pub http_response_close: u64,
    /// Cumulative response time in milliseconds (sent responses only)
    pub http_response_time: u64,
    /// Response count per status code
    pub status_codes: HashMap<u16, u64>,
}

/// Live async-handle counts on the context's reactor loop, populated by the
/// handle collector.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HandleStatistics {
    /// All live handles
    pub active_handles: u64,
    /// Live handles keeping the loop alive (referenced)
    pub active_and_ref_handles: u64,
    /// Live file-like handles
    pub file_handles: u64,
    /// Live TCP handles
    pub tcp_handles: u64,
    /// Live timer handles
    pub timer_handles: u64,
}

// ============================================================================
// Dump actions
// ============================================================================

/// A profiling/dump action an external command handler may run on a context.
///
/// The agent core only records whether an action is currently running; the
/// dump pipeline owns the semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DumpAction {
    StartCpuProfiling,
    StopCpuProfiling,
    StartSamplingHeapProfiling,
    StopSamplingHeapProfiling,
    Heapdump,
    StartGcProfiling,
    StopGcProfiling,
    DiagnosticReport,
    Coredump,
}

/// Running-state per action, written by command handlers and read by the
/// dump pipeline.
pub type ActionMap = HashMap<DumpAction, bool>;
