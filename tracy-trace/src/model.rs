use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Reference into the trace's string pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringRef(pub u32);

/// Identifier of a source location record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SrcLocId(pub u32);

/// Identifier of a callstack. Zero means "no callstack".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallstackId(pub u32);

impl CallstackId {
    pub const NONE: CallstackId = CallstackId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Identifier of one return-address slot in a callstack.
///
/// The capture worker hands out canonicalized addresses here; the top bit
/// distinguishes kernel addresses from user-space addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallstackFrameId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Optional display name, set for named zones.
    pub name: Option<StringRef>,
    pub function: StringRef,
    pub file: StringRef,
    pub line: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneExtra {
    pub name: Option<StringRef>,
    pub text: Option<StringRef>,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub start: i64,
    /// Negative while the zone is still open.
    pub end: i64,
    pub src_loc: SrcLocId,
    pub extra: Option<ZoneExtra>,
    pub children: ZoneTimeline,
}

impl Zone {
    pub fn is_end_valid(&self) -> bool {
        self.end >= 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuZone {
    pub gpu_start: i64,
    /// Negative until the GPU timestamp has been resolved.
    pub gpu_end: i64,
    pub cpu_start: i64,
    pub cpu_end: i64,
    pub src_loc: SrcLocId,
    pub name: Option<StringRef>,
    pub children: GpuTimeline,
}

impl GpuZone {
    pub fn is_end_valid(&self) -> bool {
        self.gpu_end >= 0
    }
}

/// A list of child zones, in one of the two physical encodings the capture
/// worker produces: a contiguous array ("magic") or a pointer list that may
/// contain gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Timeline<T> {
    Magic(Vec<T>),
    Pointers(Vec<Option<Box<T>>>),
}

pub type ZoneTimeline = Timeline<Zone>;
pub type GpuTimeline = Timeline<GpuZone>;

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Timeline::Magic(Vec::new())
    }
}

impl<T> Timeline<T> {
    pub fn is_empty(&self) -> bool {
        match self {
            Timeline::Magic(zones) => zones.is_empty(),
            Timeline::Pointers(zones) => zones.iter().all(|z| z.is_none()),
        }
    }

    /// Iterates the zones regardless of encoding, skipping gaps.
    pub fn iter(&self) -> TimelineIter<'_, T> {
        match self {
            Timeline::Magic(zones) => TimelineIter::Magic(zones.iter()),
            Timeline::Pointers(zones) => TimelineIter::Pointers(zones.iter()),
        }
    }
}

impl<'a, T> IntoIterator for &'a Timeline<T> {
    type Item = &'a T;
    type IntoIter = TimelineIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub enum TimelineIter<'a, T> {
    Magic(std::slice::Iter<'a, T>),
    Pointers(std::slice::Iter<'a, Option<Box<T>>>),
}

impl<'a, T> Iterator for TimelineIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        match self {
            TimelineIter::Magic(iter) => iter.next(),
            TimelineIter::Pointers(iter) => {
                for slot in iter {
                    if let Some(zone) = slot {
                        return Some(zone);
                    }
                }
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SampleData {
    pub time: i64,
    pub callstack: CallstackId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadData {
    pub id: u64,
    pub name: Option<String>,
    pub timeline: ZoneTimeline,
    pub samples: Vec<SampleData>,
}

/// Symbol information for one return-address slot. `data` holds the inlined
/// sub-frames with the innermost frame at index 0; the last entry is the
/// enclosing (non-inlined) symbol.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallstackFrameData {
    pub data: Vec<CallstackFrame>,
    pub image_name: Option<StringRef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CallstackFrame {
    pub name: StringRef,
    pub file: StringRef,
    pub line: u32,
    pub sym_addr: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SymbolData {
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockEventKind {
    Wait,
    Obtain,
    Release,
    WaitShared,
    ObtainShared,
    ReleaseShared,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LockEvent {
    pub time: i64,
    pub kind: LockEventKind,
    /// Compressed thread bit, matching `LockData::thread_map` values.
    pub thread: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockData {
    pub valid: bool,
    pub src_loc: SrcLocId,
    pub custom_name: Option<StringRef>,
    pub thread_map: HashMap<u64, u8>,
    pub timeline: Vec<LockEvent>,
}

impl Default for LockData {
    fn default() -> Self {
        LockData {
            valid: true,
            src_loc: SrcLocId(0),
            custom_name: None,
            thread_map: HashMap::new(),
            timeline: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessageData {
    pub time: i64,
    pub text: StringRef,
    pub color: u32,
    /// Compressed thread index, resolved via [`TraceData::decompress_thread`].
    pub thread: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlotType {
    User,
    Memory,
    SysTime,
    Power,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlotItem {
    pub time: i64,
    pub val: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotData {
    pub name: StringRef,
    pub kind: PlotType,
    pub data: Vec<PlotItem>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameEvent {
    pub start: i64,
    /// Negative while the frame is still in flight.
    pub end: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSeries {
    pub name: StringRef,
    pub frames: Vec<FrameEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuContextKind {
    Invalid,
    OpenGl,
    Vulkan,
    OpenCl,
    Direct3D12,
    Direct3D11,
    Metal,
}

impl GpuContextKind {
    pub fn label(self) -> &'static str {
        match self {
            GpuContextKind::Invalid => "Invalid",
            GpuContextKind::OpenGl => "OpenGL",
            GpuContextKind::Vulkan => "Vulkan",
            GpuContextKind::OpenCl => "OpenCL",
            GpuContextKind::Direct3D12 => "Direct3D 12",
            GpuContextKind::Direct3D11 => "Direct3D 11",
            GpuContextKind::Metal => "Metal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuContext {
    pub name: Option<StringRef>,
    pub kind: GpuContextKind,
    pub thread_data: BTreeMap<u64, GpuTimeline>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemEvent {
    pub time_alloc: i64,
    /// Negative while the allocation is still live.
    pub time_free: i64,
    pub size: u64,
    pub ptr: u64,
    pub cs_alloc: CallstackId,
    pub cs_free: CallstackId,
    /// Compressed thread indices, resolved via [`TraceData::decompress_thread`].
    pub thread_alloc: u16,
    pub thread_free: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryNamespace {
    pub events: Vec<MemEvent>,
}

/// The materialized capture. Field layout is the serialized capture
/// container format; the methods are the query surface consumers use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceData {
    pub capture_name: String,
    pub capture_program: String,
    /// Capture wall-clock time, nanoseconds since the Unix epoch.
    pub capture_time: i64,
    /// Line-oriented `Key: value` description of the capture host.
    pub host_info: String,
    pub app_info: Vec<StringRef>,
    pub pid: u64,
    /// Sampling period in nanoseconds.
    pub sampling_period: i64,

    pub strings: Vec<String>,
    pub source_locations: Vec<SourceLocation>,
    pub threads: Vec<ThreadData>,
    pub pid_map: HashMap<u64, u64>,
    /// Compressed thread index to thread id.
    pub thread_compression: Vec<u64>,

    /// Callstack id to frame list, innermost frame first. Id zero is reserved.
    pub callstacks: Vec<Vec<CallstackFrameId>>,
    pub callstack_frames: HashMap<u64, CallstackFrameData>,
    pub symbols: HashMap<u64, SymbolData>,

    pub locks: BTreeMap<u32, LockData>,
    pub messages: Vec<MessageData>,
    pub plots: Vec<PlotData>,
    pub frame_series: Vec<FrameSeries>,
    pub gpu_contexts: Vec<GpuContext>,
    pub memory: BTreeMap<u64, MemoryNamespace>,
}

impl TraceData {
    pub fn get_string(&self, s: StringRef) -> &str {
        self.strings.get(s.0 as usize).map_or("", String::as_str)
    }

    pub fn source_location(&self, id: SrcLocId) -> Option<&SourceLocation> {
        self.source_locations.get(id.0 as usize)
    }

    /// Display name of a zone: the extra-data override, then the source
    /// location's name, then its function.
    pub fn zone_name(&self, zone: &Zone) -> &str {
        if let Some(name) = zone.extra.as_ref().and_then(|extra| extra.name) {
            return self.get_string(name);
        }
        self.src_loc_name(zone.src_loc)
    }

    pub fn gpu_zone_name(&self, zone: &GpuZone) -> &str {
        if let Some(name) = zone.name {
            return self.get_string(name);
        }
        self.src_loc_name(zone.src_loc)
    }

    fn src_loc_name(&self, id: SrcLocId) -> &str {
        match self.source_location(id) {
            Some(loc) => match loc.name {
                Some(name) => self.get_string(name),
                None => self.get_string(loc.function),
            },
            None => "",
        }
    }

    /// The frame list of a callstack, innermost frame first. Unknown ids
    /// yield an empty list.
    pub fn callstack(&self, id: CallstackId) -> &[CallstackFrameId] {
        self.callstacks.get(id.0 as usize).map_or(&[], Vec::as_slice)
    }

    pub fn callstack_frame(&self, id: CallstackFrameId) -> Option<&CallstackFrameData> {
        self.callstack_frames.get(&id.0)
    }

    /// The canonical address behind a callstack frame id. The id itself
    /// carries the canonicalized pointer.
    pub fn canonical_pointer(&self, id: CallstackFrameId) -> u64 {
        id.0
    }

    pub fn symbol_data(&self, addr: u64) -> Option<&SymbolData> {
        self.symbols.get(&addr)
    }

    pub fn pid_for_tid(&self, tid: u64) -> Option<u64> {
        self.pid_map.get(&tid).copied()
    }

    pub fn decompress_thread(&self, thread: u16) -> u64 {
        self.thread_compression
            .get(thread as usize)
            .copied()
            .unwrap_or(0)
    }

    /// The primary frame series, whose markers go onto the first thread.
    pub fn frames_base(&self) -> Option<&FrameSeries> {
        self.frame_series.first()
    }
}
