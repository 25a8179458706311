//! Converts a captured Tracy trace into the "processed profile" JSON format
//! consumed by the [Firefox Profiler](https://profiler.firefox.com/).
//!
//! The output is not a tree of events but a set of dense parallel arrays
//! linked by integer indices: per-thread frame, func, native-symbol,
//! resource, stack, sample, marker and native-allocation tables, plus a
//! document-wide string array and library list. [`build_profile`] runs the
//! collectors over every thread of a [`tracy_trace::TraceData`] and
//! assembles the final document; [`write_profile`] serializes it.

pub mod category;
mod fast_hash_map;
pub mod graph_color;
pub mod lib_table;
pub mod marker_schema;
pub mod profile;
mod serialization_helpers;
pub mod string_table;
pub mod thread_tables;

pub use profile::{build_profile, parse_host_info, write_profile, HostInfo, Profile};

/// Trace timestamps are nanoseconds; the profile format wants milliseconds.
pub fn ns_to_ms(ns: i64) -> f64 {
    ns as f64 / 1e6
}
