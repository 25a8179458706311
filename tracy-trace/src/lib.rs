//! In-memory model of a captured Tracy trace, plus the query surface that
//! consumers such as the `fxexport` converter run against.
//!
//! The model mirrors what the capture worker materializes after decoding a
//! trace: per-thread zone timelines, callstack samples, lock timelines,
//! messages, plots, frame series, GPU contexts, and memory event streams,
//! all referencing a shared string pool by index.
//!
//! [`Worker::open`] loads a serialized capture on a background thread and
//! exposes readiness predicates; once both predicates report true, the
//! [`TraceData`] can be borrowed and queried. Use [`Worker::from_data`] to
//! wrap an already-materialized model (tests do this).

mod error;
mod model;
mod worker;

pub use error::TraceError;
pub use model::{
    CallstackFrame, CallstackFrameData, CallstackFrameId, CallstackId, FrameEvent, FrameSeries,
    GpuContext, GpuContextKind, GpuTimeline, GpuZone, LockData, LockEvent, LockEventKind,
    MemEvent, MemoryNamespace, MessageData, PlotData, PlotItem, PlotType, SampleData,
    SourceLocation, SrcLocId, StringRef, SymbolData, ThreadData, Timeline, TimelineIter,
    TraceData, Zone, ZoneExtra, ZoneTimeline,
};
pub use worker::Worker;
