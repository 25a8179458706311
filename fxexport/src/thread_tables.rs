use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Value};
use tracy_trace::{
    CallstackFrameId, GpuTimeline, GpuZone, LockEventKind, ThreadData, TraceData, Zone,
    ZoneTimeline,
};

use crate::category::CategoryHandle;
use crate::fast_hash_map::FastHashMap;
use crate::graph_color::graph_color;
use crate::lib_table::{LibIndex, LibTable};
use crate::ns_to_ms;
use crate::serialization_helpers::{Column, SingleValueColumn};
use crate::string_table::{StringIndex, StringTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameIndex(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncIndex(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeSymbolIndex(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceIndex(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackIndex(u32);

macro_rules! serialize_as_u32 {
    ($($ty:ident),*) => {
        $(impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u32(self.0)
            }
        })*
    };
}

serialize_as_u32!(FrameIndex, FuncIndex, NativeSymbolIndex, ResourceIndex, StackIndex);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPhase {
    Instant = 0,
    Interval = 1,
    IntervalStart = 2,
    IntervalEnd = 3,
}

impl Serialize for MarkerPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone)]
struct FrameEntry {
    func: FuncIndex,
    native_symbol: NativeSymbolIndex,
    category: CategoryHandle,
    address: i64,
    line: u32,
    column: u32,
    inline_depth: u32,
}

#[derive(Debug, Clone)]
struct FuncEntry {
    name: StringIndex,
    resource: Option<ResourceIndex>,
    file_name: StringIndex,
    line_number: u32,
    column_number: u32,
}

#[derive(Debug, Clone)]
struct NativeSymbolEntry {
    lib: Option<LibIndex>,
    address: u64,
    name: StringIndex,
    function_size: u32,
}

#[derive(Debug, Clone)]
struct ResourceEntry {
    lib: Option<LibIndex>,
    name: StringIndex,
}

#[derive(Debug, Clone)]
struct StackEntry {
    prefix: Option<StackIndex>,
    frame: FrameIndex,
}

#[derive(Debug, Clone)]
struct SampleEntry {
    time: f64,
    stack: Option<StackIndex>,
    weight: f64,
}

#[derive(Debug, Clone)]
struct AllocationEntry {
    time: f64,
    weight: i64,
    stack: Option<StackIndex>,
    memory_address: u64,
    thread_id: u64,
}

#[derive(Debug, Clone)]
struct MarkerEntry {
    category: CategoryHandle,
    name: StringIndex,
    start_time: f64,
    end_time: f64,
    phase: MarkerPhase,
    data: Value,
}

/// Everything a frame row needs before interning.
pub struct FrameSpec<'a> {
    pub sym_addr: u64,
    pub name: &'a str,
    pub file_name: &'a str,
    pub line: u32,
    pub column: u32,
    pub inline_depth: u32,
    pub image_name: &'a str,
    pub sym_size: u32,
    pub category: CategoryHandle,
}

/// Category assignment for the frames of an interned callstack.
#[derive(Debug, Clone, Copy)]
enum StackCategory {
    /// Kernel addresses get their own category, everything else is `user`.
    Sampled {
        user: CategoryHandle,
        kernel: CategoryHandle,
    },
    Fixed(CategoryHandle),
}

fn is_kernel_address(addr: u64) -> bool {
    (addr >> 63) != 0
}

/// Per-thread accumulator for the columnar tables of one output thread.
///
/// All tables grow monotonically while the collectors run; the dedup maps
/// are keyed the same way the rows are, so re-observing a symbol, frame or
/// stack hands back the existing row.
#[derive(Debug, Clone, Default)]
pub struct ThreadTables {
    frames: Vec<FrameEntry>,
    funcs: Vec<FuncEntry>,
    native_symbols: Vec<NativeSymbolEntry>,
    resources: Vec<ResourceEntry>,
    stacks: Vec<StackEntry>,
    samples: Vec<SampleEntry>,
    allocations: Vec<AllocationEntry>,
    markers: Vec<MarkerEntry>,

    min_time: Option<i64>,
    max_time: i64,

    sym_addr_to_native_symbol: FastHashMap<u64, NativeSymbolIndex>,
    sym_addr_to_func: FastHashMap<u64, FuncIndex>,
    lib_name_to_resource: FastHashMap<String, ResourceIndex>,
    frame_key_to_frame: FastHashMap<u64, FrameIndex>,
    stack_key_to_stack: FastHashMap<u64, StackIndex>,
}

impl ThreadTables {
    pub fn new() -> Self {
        Default::default()
    }

    fn observe_time(&mut self, time: i64) {
        self.min_time = Some(self.min_time.map_or(time, |min| min.min(time)));
        self.max_time = self.max_time.max(time);
    }

    pub fn register_time_ms(&self) -> f64 {
        ns_to_ms(self.min_time.unwrap_or(0))
    }

    pub fn unregister_time_ms(&self) -> f64 {
        ns_to_ms(self.max_time)
    }

    pub fn has_markers(&self) -> bool {
        !self.markers.is_empty()
    }

    fn get_or_create_resource(&mut self, st: &mut StringTable, lt: &mut LibTable, lib_name: &str) -> ResourceIndex {
        if let Some(&idx) = self.lib_name_to_resource.get(lib_name) {
            return idx;
        }
        let idx = ResourceIndex(self.resources.len() as u32);
        self.resources.push(ResourceEntry {
            lib: lt.intern(lib_name, 0, 0),
            name: st.intern(lib_name),
        });
        self.lib_name_to_resource.insert(lib_name.to_string(), idx);
        idx
    }

    fn get_or_create_native_symbol(
        &mut self,
        st: &mut StringTable,
        lt: &mut LibTable,
        sym_addr: u64,
        name: &str,
        image_name: &str,
        size: u32,
    ) -> NativeSymbolIndex {
        if let Some(&idx) = self.sym_addr_to_native_symbol.get(&sym_addr) {
            if !image_name.is_empty() {
                lt.intern(image_name, sym_addr, size);
            }
            return idx;
        }

        let mut lib = None;
        if !image_name.is_empty() {
            lib = lt.intern(image_name, sym_addr, size);
            self.get_or_create_resource(st, lt, image_name);
        }

        let idx = NativeSymbolIndex(self.native_symbols.len() as u32);
        self.native_symbols.push(NativeSymbolEntry {
            lib,
            address: sym_addr,
            name: st.intern(name),
            function_size: size,
        });
        self.sym_addr_to_native_symbol.insert(sym_addr, idx);
        idx
    }

    fn get_or_create_func(
        &mut self,
        st: &mut StringTable,
        sym_addr: u64,
        name: &str,
        file_name: &str,
        line: u32,
        resource: Option<ResourceIndex>,
    ) -> FuncIndex {
        if let Some(&idx) = self.sym_addr_to_func.get(&sym_addr) {
            return idx;
        }
        let idx = FuncIndex(self.funcs.len() as u32);
        self.funcs.push(FuncEntry {
            name: st.intern(name),
            resource,
            file_name: st.intern(file_name),
            line_number: line,
            column_number: 0,
        });
        self.sym_addr_to_func.insert(sym_addr, idx);
        idx
    }

    /// Inlined sub-frames share their symbol's function and native-symbol
    /// rows but occupy distinct frame rows, keyed by (address, depth).
    pub fn get_or_create_frame(
        &mut self,
        st: &mut StringTable,
        lt: &mut LibTable,
        frame: FrameSpec<'_>,
    ) -> FrameIndex {
        let frame_key = frame.sym_addr ^ ((frame.inline_depth as u64) << 48);
        if let Some(&idx) = self.frame_key_to_frame.get(&frame_key) {
            return idx;
        }

        let mut resource = None;
        if !frame.image_name.is_empty() {
            resource = Some(self.get_or_create_resource(st, lt, frame.image_name));
        }

        let func = self.get_or_create_func(
            st,
            frame.sym_addr,
            frame.name,
            frame.file_name,
            frame.line,
            resource,
        );
        let native_symbol = self.get_or_create_native_symbol(
            st,
            lt,
            frame.sym_addr,
            frame.name,
            frame.image_name,
            frame.sym_size,
        );

        let idx = FrameIndex(self.frames.len() as u32);
        self.frames.push(FrameEntry {
            func,
            native_symbol,
            category: frame.category,
            address: frame.sym_addr as i64,
            line: frame.line,
            column: frame.column,
            inline_depth: frame.inline_depth,
        });
        self.frame_key_to_frame.insert(frame_key, idx);
        idx
    }

    pub fn get_or_create_stack(&mut self, prefix: Option<StackIndex>, frame: FrameIndex) -> StackIndex {
        let key = (prefix.map_or(0, |p| p.0 as u64 + 1) << 32) | frame.0 as u64;
        if let Some(&idx) = self.stack_key_to_stack.get(&key) {
            return idx;
        }
        let idx = StackIndex(self.stacks.len() as u32);
        // Prefixes point backwards, which is what makes the table a tree.
        debug_assert!(prefix.map_or(true, |p| p.0 < idx.0));
        self.stacks.push(StackEntry { prefix, frame });
        self.stack_key_to_stack.insert(key, idx);
        idx
    }

    /// Walks a zone timeline depth first and emits one `TracyZone` interval
    /// marker per closed zone. Open zones are skipped along with their
    /// subtrees.
    pub fn collect_zones<'a>(
        &mut self,
        trace: &'a TraceData,
        timeline: &'a ZoneTimeline,
        st: &mut StringTable,
        category: CategoryHandle,
    ) {
        let mut work: Vec<&'a Zone> = Vec::new();
        push_pre_order(&mut work, timeline);
        while let Some(zone) = work.pop() {
            self.collect_zone(trace, zone, st, category, &mut work);
        }
    }

    fn collect_zone<'a>(
        &mut self,
        trace: &'a TraceData,
        zone: &'a Zone,
        st: &mut StringTable,
        category: CategoryHandle,
        work: &mut Vec<&'a Zone>,
    ) {
        if !zone.is_end_valid() {
            return;
        }

        let name = trace.zone_name(zone);
        let mut text = None;
        let mut color = 0;
        if let Some(extra) = &zone.extra {
            text = extra.text.map(|t| trace.get_string(t));
            color = extra.color;
        }

        self.observe_time(zone.start);
        self.observe_time(zone.end);

        let mut data = json!({
            "type": "TracyZone",
            "name": st.intern(name),
        });
        if let Some(text) = text {
            data["text"] = json!(st.intern(text));
        }
        if color != 0 {
            if let Some(color) = graph_color(color) {
                data["color"] = json!(color);
            }
        }
        if let Some(loc) = trace.source_location(zone.src_loc) {
            let file = trace.get_string(loc.file);
            if !file.is_empty() {
                data["file"] = json!(st.intern(file));
                data["line"] = json!(loc.line);
            }
            let function = trace.get_string(loc.function);
            if !function.is_empty() {
                data["function"] = json!(st.intern(function));
            }
        }

        self.markers.push(MarkerEntry {
            category,
            name: st.intern("TracyZone"),
            start_time: ns_to_ms(zone.start),
            end_time: ns_to_ms(zone.end),
            phase: MarkerPhase::Interval,
            data,
        });

        push_pre_order(work, &zone.children);
    }

    /// Same walk as [`ThreadTables::collect_zones`], for one GPU timeline.
    /// Markers carry both the GPU and the CPU time pair.
    pub fn collect_gpu_zones<'a>(
        &mut self,
        trace: &'a TraceData,
        timeline: &'a GpuTimeline,
        st: &mut StringTable,
        category: CategoryHandle,
    ) {
        let mut work: Vec<&'a GpuZone> = Vec::new();
        push_pre_order(&mut work, timeline);
        while let Some(zone) = work.pop() {
            self.collect_gpu_zone(trace, zone, st, category, &mut work);
        }
    }

    fn collect_gpu_zone<'a>(
        &mut self,
        trace: &'a TraceData,
        zone: &'a GpuZone,
        st: &mut StringTable,
        category: CategoryHandle,
        work: &mut Vec<&'a GpuZone>,
    ) {
        if !zone.is_end_valid() {
            return;
        }

        let name = trace.gpu_zone_name(zone);

        self.observe_time(zone.gpu_start);
        self.observe_time(zone.gpu_end);

        let mut data = json!({
            "type": "TracyGpuZone",
            "name": st.intern(name),
            "gpuStart": ns_to_ms(zone.gpu_start),
            "gpuEnd": ns_to_ms(zone.gpu_end),
            "cpuStart": ns_to_ms(zone.cpu_start),
            "cpuEnd": ns_to_ms(zone.cpu_end),
        });
        if let Some(loc) = trace.source_location(zone.src_loc) {
            let file = trace.get_string(loc.file);
            if !file.is_empty() {
                data["file"] = json!(st.intern(file));
                data["line"] = json!(loc.line);
            }
            let function = trace.get_string(loc.function);
            if !function.is_empty() {
                data["function"] = json!(st.intern(function));
            }
        }

        self.markers.push(MarkerEntry {
            category,
            name: st.intern("TracyGpuZone"),
            start_time: ns_to_ms(zone.gpu_start),
            end_time: ns_to_ms(zone.gpu_end),
            phase: MarkerPhase::Interval,
            data,
        });

        push_pre_order(work, &zone.children);
    }

    /// One instant `TracyMessage` marker per log message on this thread.
    pub fn process_messages(
        &mut self,
        trace: &TraceData,
        st: &mut StringTable,
        category: CategoryHandle,
        thread_id: u64,
    ) {
        for msg in &trace.messages {
            if trace.decompress_thread(msg.thread) != thread_id {
                continue;
            }

            self.observe_time(msg.time);

            let mut data = json!({
                "type": "TracyMessage",
                "text": st.intern(trace.get_string(msg.text)),
            });
            if msg.color != 0 {
                if let Some(color) = graph_color(msg.color) {
                    data["color"] = json!(color);
                }
            }

            let time_ms = ns_to_ms(msg.time);
            self.markers.push(MarkerEntry {
                category,
                name: st.intern("TracyMessage"),
                start_time: time_ms,
                end_time: time_ms,
                phase: MarkerPhase::Instant,
                data,
            });
        }
    }

    /// Walks every lock timeline this thread participates in and emits one
    /// `TracyLock` interval marker per wait-until-obtain span.
    pub fn process_locks(
        &mut self,
        trace: &TraceData,
        st: &mut StringTable,
        category: CategoryHandle,
        thread_id: u64,
    ) {
        for (&lock_id, lock) in &trace.locks {
            if !lock.valid {
                continue;
            }
            let Some(&thread_bit) = lock.thread_map.get(&thread_id) else {
                continue;
            };

            let lock_name = match lock.custom_name {
                Some(name) => trace.get_string(name),
                None => trace
                    .source_location(lock.src_loc)
                    .map_or("", |loc| trace.get_string(loc.function)),
            };

            let mut wait_start = -1i64;

            for ev in &lock.timeline {
                if ev.thread != thread_bit {
                    continue;
                }

                self.observe_time(ev.time);

                match ev.kind {
                    LockEventKind::Wait | LockEventKind::WaitShared => {
                        wait_start = ev.time;
                    }
                    LockEventKind::Obtain | LockEventKind::ObtainShared => {
                        if wait_start >= 0 {
                            let is_shared = ev.kind == LockEventKind::ObtainShared;
                            self.markers.push(MarkerEntry {
                                category,
                                name: st.intern("TracyLock"),
                                start_time: ns_to_ms(wait_start),
                                end_time: ns_to_ms(ev.time),
                                phase: MarkerPhase::Interval,
                                data: json!({
                                    "type": "TracyLock",
                                    "name": st.intern(lock_name),
                                    "lockId": lock_id,
                                    "operation": if is_shared { "wait_shared" } else { "wait" },
                                }),
                            });
                            wait_start = -1;
                        }
                    }
                    LockEventKind::Release | LockEventKind::ReleaseShared => {}
                }
            }
        }
    }

    /// One `TracyFrame` interval marker per completed frame of the primary
    /// frame series. Runs on the first thread only.
    pub fn process_frames(&mut self, trace: &TraceData, st: &mut StringTable, category: CategoryHandle) {
        let Some(series) = trace.frames_base() else {
            return;
        };
        let frame_name = trace.get_string(series.name);

        for (i, frame) in series.frames.iter().enumerate() {
            if frame.end < 0 {
                continue;
            }

            self.observe_time(frame.start);
            self.observe_time(frame.end);

            let duration_ms = ns_to_ms(frame.end - frame.start);
            let fps = if duration_ms > 0.0 { 1000.0 / duration_ms } else { 0.0 };

            self.markers.push(MarkerEntry {
                category,
                name: st.intern("TracyFrame"),
                start_time: ns_to_ms(frame.start),
                end_time: ns_to_ms(frame.end),
                phase: MarkerPhase::Interval,
                data: json!({
                    "type": "TracyFrame",
                    "name": st.intern(frame_name),
                    "frameNumber": i,
                    "duration": duration_ms,
                    "fps": fps,
                }),
            });
        }
    }

    /// Interns every sampled callstack and appends one sample row per
    /// sample, in source (time) order.
    pub fn process_samples(
        &mut self,
        trace: &TraceData,
        td: &ThreadData,
        st: &mut StringTable,
        lt: &mut LibTable,
        user_category: CategoryHandle,
        kernel_category: CategoryHandle,
    ) {
        self.samples.reserve(td.samples.len());

        for sample in &td.samples {
            if sample.callstack.is_none() {
                continue;
            }
            let callstack = trace.callstack(sample.callstack);
            if callstack.is_empty() {
                continue;
            }

            self.observe_time(sample.time);

            let stack = self.intern_callstack(
                trace,
                st,
                lt,
                callstack,
                StackCategory::Sampled {
                    user: user_category,
                    kernel: kernel_category,
                },
            );

            self.samples.push(SampleEntry {
                time: ns_to_ms(sample.time),
                stack,
                weight: 1.0,
            });
        }
    }

    /// Appends one row per allocation and one per free, each with its own
    /// callstack, then stable-sorts by time so paired events at identical
    /// times keep source order.
    pub fn process_allocations(
        &mut self,
        trace: &TraceData,
        st: &mut StringTable,
        lt: &mut LibTable,
        category: CategoryHandle,
    ) {
        for namespace in trace.memory.values() {
            for ev in &namespace.events {
                let size = ev.size as i64;

                self.observe_time(ev.time_alloc);
                let stack = self.intern_callstack(
                    trace,
                    st,
                    lt,
                    trace.callstack(ev.cs_alloc),
                    StackCategory::Fixed(category),
                );
                self.allocations.push(AllocationEntry {
                    time: ns_to_ms(ev.time_alloc),
                    weight: size,
                    stack,
                    memory_address: ev.ptr,
                    thread_id: trace.decompress_thread(ev.thread_alloc),
                });

                if ev.time_free >= 0 {
                    self.observe_time(ev.time_free);
                    let stack = self.intern_callstack(
                        trace,
                        st,
                        lt,
                        trace.callstack(ev.cs_free),
                        StackCategory::Fixed(category),
                    );
                    self.allocations.push(AllocationEntry {
                        time: ns_to_ms(ev.time_free),
                        weight: -size,
                        stack,
                        memory_address: ev.ptr,
                        thread_id: trace.decompress_thread(ev.thread_free),
                    });
                }
            }
        }

        // sort_by is stable, which invariant 4 relies on.
        self.allocations.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Interns one callstack into the frame and stack tables, outermost
    /// frame first so prefix chains grow from root to leaf. Returns the leaf
    /// stack row, or `None` when no frame resolved.
    fn intern_callstack(
        &mut self,
        trace: &TraceData,
        st: &mut StringTable,
        lt: &mut LibTable,
        callstack: &[CallstackFrameId],
        categories: StackCategory,
    ) -> Option<StackIndex> {
        let mut stack = None;

        for &frame_id in callstack.iter().rev() {
            let Some(frame_data) = trace.callstack_frame(frame_id) else {
                continue;
            };

            let category = match categories {
                StackCategory::Fixed(category) => category,
                StackCategory::Sampled { user, kernel } => {
                    if is_kernel_address(trace.canonical_pointer(frame_id)) {
                        kernel
                    } else {
                        user
                    }
                }
            };

            let image_name = frame_data
                .image_name
                .map_or("", |name| trace.get_string(name));
            let sub_frame_count = frame_data.data.len();

            // data[0] is the innermost inlined frame; walk outermost first.
            for (j, frame) in frame_data.data.iter().enumerate().rev() {
                let sym_size = trace.symbol_data(frame.sym_addr).map_or(0, |s| s.size);
                let frame_idx = self.get_or_create_frame(
                    st,
                    lt,
                    FrameSpec {
                        sym_addr: frame.sym_addr,
                        name: trace.get_string(frame.name),
                        file_name: trace.get_string(frame.file),
                        line: frame.line,
                        column: 0,
                        inline_depth: (sub_frame_count - 1 - j) as u32,
                        image_name,
                        sym_size,
                        category,
                    },
                );
                stack = Some(self.get_or_create_stack(stack, frame_idx));
            }
        }

        stack
    }

    pub fn frame_table(&self) -> impl Serialize + '_ {
        SerializableFrameTable(self)
    }

    pub fn func_table(&self) -> impl Serialize + '_ {
        SerializableFuncTable(self)
    }

    pub fn native_symbols_table(&self) -> impl Serialize + '_ {
        SerializableNativeSymbols(self)
    }

    pub fn resource_table(&self) -> impl Serialize + '_ {
        SerializableResourceTable(self)
    }

    pub fn stack_table(&self) -> impl Serialize + '_ {
        SerializableStackTable(self)
    }

    pub fn samples_table(&self) -> impl Serialize + '_ {
        SerializableSampleTable(self)
    }

    pub fn native_allocations_table(&self) -> impl Serialize + '_ {
        SerializableNativeAllocations(self)
    }

    pub fn markers_table(&self) -> impl Serialize + '_ {
        SerializableMarkerTable(self)
    }
}

fn push_pre_order<'a, T>(work: &mut Vec<&'a T>, timeline: &'a tracy_trace::Timeline<T>) {
    let start = work.len();
    work.extend(timeline.iter());
    work[start..].reverse();
}

struct SerializableFrameTable<'a>(&'a ThreadTables);

impl Serialize for SerializableFrameTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let frames = &self.0.frames;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &frames.len())?;
        map.serialize_entry("address", &Column(frames, |f: &FrameEntry| f.address))?;
        map.serialize_entry("category", &Column(frames, |f: &FrameEntry| f.category))?;
        map.serialize_entry("subcategory", &SingleValueColumn((), frames.len()))?;
        map.serialize_entry("func", &Column(frames, |f: &FrameEntry| f.func))?;
        map.serialize_entry("nativeSymbol", &Column(frames, |f: &FrameEntry| f.native_symbol))?;
        map.serialize_entry("innerWindowID", &SingleValueColumn((), frames.len()))?;
        map.serialize_entry("line", &Column(frames, |f: &FrameEntry| (f.line > 0).then_some(f.line)))?;
        map.serialize_entry("column", &Column(frames, |f: &FrameEntry| (f.column > 0).then_some(f.column)))?;
        map.serialize_entry("inlineDepth", &Column(frames, |f: &FrameEntry| f.inline_depth))?;
        map.end()
    }
}

struct SerializableFuncTable<'a>(&'a ThreadTables);

impl Serialize for SerializableFuncTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let funcs = &self.0.funcs;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &funcs.len())?;
        map.serialize_entry("name", &Column(funcs, |f: &FuncEntry| f.name))?;
        map.serialize_entry("isJS", &SingleValueColumn(false, funcs.len()))?;
        map.serialize_entry("relevantForJS", &SingleValueColumn(false, funcs.len()))?;
        map.serialize_entry(
            "resource",
            &Column(funcs, |f: &FuncEntry| f.resource.map_or(-1, |r| r.0 as i64)),
        )?;
        map.serialize_entry("fileName", &Column(funcs, |f: &FuncEntry| f.file_name))?;
        map.serialize_entry(
            "lineNumber",
            &Column(funcs, |f: &FuncEntry| (f.line_number > 0).then_some(f.line_number)),
        )?;
        map.serialize_entry(
            "columnNumber",
            &Column(funcs, |f: &FuncEntry| {
                (f.column_number > 0).then_some(f.column_number)
            }),
        )?;
        map.end()
    }
}

struct SerializableNativeSymbols<'a>(&'a ThreadTables);

impl Serialize for SerializableNativeSymbols<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let symbols = &self.0.native_symbols;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &symbols.len())?;
        map.serialize_entry(
            "libIndex",
            &Column(symbols, |s: &NativeSymbolEntry| s.lib.map_or(-1, |l| l.0 as i64)),
        )?;
        map.serialize_entry("address", &Column(symbols, |s: &NativeSymbolEntry| s.address))?;
        map.serialize_entry("name", &Column(symbols, |s: &NativeSymbolEntry| s.name))?;
        map.serialize_entry(
            "functionSize",
            &Column(symbols, |s: &NativeSymbolEntry| {
                (s.function_size > 0).then_some(s.function_size)
            }),
        )?;
        map.end()
    }
}

struct SerializableResourceTable<'a>(&'a ThreadTables);

impl Serialize for SerializableResourceTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let resources = &self.0.resources;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &resources.len())?;
        map.serialize_entry(
            "lib",
            &Column(resources, |r: &ResourceEntry| r.lib.map_or(-1, |l| l.0 as i64)),
        )?;
        map.serialize_entry("name", &Column(resources, |r: &ResourceEntry| r.name))?;
        map.serialize_entry("host", &SingleValueColumn((), resources.len()))?;
        map.serialize_entry("type", &SingleValueColumn(1, resources.len()))?;
        map.end()
    }
}

struct SerializableStackTable<'a>(&'a ThreadTables);

impl Serialize for SerializableStackTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stacks = &self.0.stacks;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &stacks.len())?;
        map.serialize_entry("prefix", &Column(stacks, |s: &StackEntry| s.prefix))?;
        map.serialize_entry("frame", &Column(stacks, |s: &StackEntry| s.frame))?;
        map.end()
    }
}

struct SerializableSampleTable<'a>(&'a ThreadTables);

impl Serialize for SerializableSampleTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let samples = &self.0.samples;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &samples.len())?;
        map.serialize_entry("stack", &Column(samples, |s: &SampleEntry| s.stack))?;
        map.serialize_entry("timeDeltas", &SerializableTimeDeltas(samples))?;
        map.serialize_entry("weight", &Column(samples, |s: &SampleEntry| s.weight))?;
        map.serialize_entry("weightType", "samples")?;
        map.serialize_entry("threadCPUDelta", &SingleValueColumn((), samples.len()))?;
        map.end()
    }
}

/// Sample times go out as deltas; the first delta is the absolute time.
struct SerializableTimeDeltas<'a>(&'a [SampleEntry]);

impl Serialize for SerializableTimeDeltas<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().scan(0.0, |prev, s| {
            let delta = s.time - *prev;
            *prev = s.time;
            Some(delta)
        }))
    }
}

struct SerializableNativeAllocations<'a>(&'a ThreadTables);

impl Serialize for SerializableNativeAllocations<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let allocations = &self.0.allocations;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &allocations.len())?;
        map.serialize_entry("time", &Column(allocations, |a: &AllocationEntry| a.time))?;
        map.serialize_entry("weight", &Column(allocations, |a: &AllocationEntry| a.weight))?;
        map.serialize_entry("weightType", "bytes")?;
        map.serialize_entry("stack", &Column(allocations, |a: &AllocationEntry| a.stack))?;
        map.serialize_entry(
            "memoryAddress",
            &Column(allocations, |a: &AllocationEntry| a.memory_address),
        )?;
        map.serialize_entry("threadId", &Column(allocations, |a: &AllocationEntry| a.thread_id))?;
        map.end()
    }
}

struct SerializableMarkerTable<'a>(&'a ThreadTables);

impl Serialize for SerializableMarkerTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let markers = &self.0.markers;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("length", &markers.len())?;
        map.serialize_entry("category", &Column(markers, |m: &MarkerEntry| m.category))?;
        map.serialize_entry("data", &MarkerDataColumn(markers))?;
        map.serialize_entry("name", &Column(markers, |m: &MarkerEntry| m.name))?;
        map.serialize_entry("startTime", &Column(markers, |m: &MarkerEntry| m.start_time))?;
        map.serialize_entry("endTime", &Column(markers, |m: &MarkerEntry| m.end_time))?;
        map.serialize_entry("phase", &Column(markers, |m: &MarkerEntry| m.phase))?;
        map.end()
    }
}

struct MarkerDataColumn<'a>(&'a [MarkerEntry]);

impl Serialize for MarkerDataColumn<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|m| &m.data))
    }
}
