use std::io::Write;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;
use tracy_trace::{PlotType, TraceData};

use crate::category::{CategoryHandle, CATEGORIES};
use crate::lib_table::LibTable;
use crate::marker_schema::marker_schemas;
use crate::ns_to_ms;
use crate::string_table::StringTable;
use crate::thread_tables::ThreadTables;

/// Parsed view of the capture host's line-oriented `Key: value` info block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub compiler: String,
    pub user: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: Option<u32>,
    pub ram_bytes: Option<u64>,
}

pub fn parse_host_info(text: &str) -> HostInfo {
    let mut info = HostInfo::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim_start();
        match key {
            "OS" => info.os = value.to_string(),
            "Compiler" => info.compiler = value.to_string(),
            "User" => info.user = value.to_string(),
            "Arch" => info.arch = value.to_string(),
            "CPU" => info.cpu = value.to_string(),
            // Both of these may be the literal "unknown".
            "CPU cores" => info.cpu_cores = value.parse().ok(),
            "RAM" => info.ram_bytes = parse_ram_mb(value),
            _ => {}
        }
    }
    info
}

fn parse_ram_mb(value: &str) -> Option<u64> {
    let mb: u64 = value.strip_suffix("MB")?.trim().parse().ok()?;
    Some(mb * 1024 * 1024)
}

fn app_info_string(trace: &TraceData) -> String {
    if trace.app_info.is_empty() {
        return "<empty>".to_string();
    }
    trace
        .app_info
        .iter()
        .map(|&r| trace.get_string(r))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Output thread ids: real threads keep their numeric tid, GPU pseudo-threads
/// get a `gpu-<tid>` string.
#[derive(Debug, Clone)]
enum ProfileTid {
    Cpu(u64),
    Gpu(String),
}

impl Serialize for ProfileTid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProfileTid::Cpu(tid) => serializer.serialize_u64(*tid),
            ProfileTid::Gpu(tid) => serializer.serialize_str(tid),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileThread {
    name: String,
    is_main_thread: bool,
    process_type: &'static str,
    process_name: String,
    pid: u64,
    tid: ProfileTid,
    tables: ThreadTables,
}

impl Serialize for ProfileThread {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("isMainThread", &self.is_main_thread)?;
        map.serialize_entry("processType", self.process_type)?;
        map.serialize_entry("processName", &self.process_name)?;
        map.serialize_entry("processStartupTime", &0.0)?;
        map.serialize_entry("processShutdownTime", &())?;
        map.serialize_entry("registerTime", &self.tables.register_time_ms())?;
        map.serialize_entry("unregisterTime", &self.tables.unregister_time_ms())?;
        map.serialize_entry("pid", &self.pid.to_string())?;
        map.serialize_entry("tid", &self.tid)?;
        map.serialize_entry("frameTable", &self.tables.frame_table())?;
        map.serialize_entry("funcTable", &self.tables.func_table())?;
        map.serialize_entry("markers", &self.tables.markers_table())?;
        map.serialize_entry("nativeSymbols", &self.tables.native_symbols_table())?;
        map.serialize_entry("nativeAllocations", &self.tables.native_allocations_table())?;
        map.serialize_entry("resourceTable", &self.tables.resource_table())?;
        map.serialize_entry("samples", &self.tables.samples_table())?;
        map.serialize_entry("stackTable", &self.tables.stack_table())?;
        map.end()
    }
}

#[derive(Debug, Clone)]
pub struct Counter {
    name: String,
    category: &'static str,
    description: &'static str,
    color: &'static str,
    pid: String,
    main_thread_index: usize,
    time: Vec<f64>,
    count: Vec<f64>,
}

impl Serialize for Counter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("category", self.category)?;
        map.serialize_entry("description", self.description)?;
        map.serialize_entry("color", self.color)?;
        map.serialize_entry("pid", &self.pid)?;
        map.serialize_entry("mainThreadIndex", &self.main_thread_index)?;
        map.serialize_entry(
            "samples",
            &json!({
                "time": self.time,
                "count": self.count,
                "length": self.time.len(),
            }),
        )?;
        map.end()
    }
}

fn build_counters(trace: &TraceData, main_thread_index: usize) -> Vec<Counter> {
    let mut counters = Vec::new();

    for plot in &trace.plots {
        if plot.data.is_empty() || plot.kind == PlotType::SysTime {
            continue;
        }

        // Absolute values become delta counts; the first entry stays absolute.
        let mut time = Vec::with_capacity(plot.data.len());
        let mut count = Vec::with_capacity(plot.data.len());
        let mut prev = 0.0;
        for item in &plot.data {
            time.push(ns_to_ms(item.time));
            count.push(item.val - prev);
            prev = item.val;
        }

        let (category, description, color) = match plot.kind {
            PlotType::User => ("User", "User-defined plot", "blue"),
            PlotType::Memory => ("Memory", "Memory usage", "purple"),
            PlotType::Power => ("Power", "Power consumption", "orange"),
            _ => ("Other", "Plot data", "grey"),
        };

        counters.push(Counter {
            name: trace.get_string(plot.name).to_string(),
            category,
            description,
            color,
            pid: trace.pid.to_string(),
            main_thread_index,
            time,
            count,
        });
    }

    counters
}

#[derive(Debug, Clone)]
struct Meta {
    interval_ms: f64,
    /// Microseconds since the Unix epoch.
    start_time: f64,
    product: String,
    host: HostInfo,
    app_info: String,
    imported_from: Option<String>,
    main_thread_index: usize,
}

impl Serialize for Meta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("categories", &CATEGORIES)?;
        map.serialize_entry("debug", &false)?;
        map.serialize_entry("interval", &self.interval_ms)?;
        map.serialize_entry("markerSchema", &marker_schemas())?;
        map.serialize_entry("pausedRanges", &[] as &[()])?;
        map.serialize_entry("platform", &self.host.os)?;
        map.serialize_entry("oscpu", &self.host.os)?;
        map.serialize_entry("abi", &format!("{}-{}", self.host.arch, self.host.compiler))?;
        map.serialize_entry("CPUName", &self.host.cpu)?;
        if let Some(main_memory) = self.host.ram_bytes {
            map.serialize_entry("mainMemory", &main_memory)?;
        }
        if let Some(physical_cpus) = self.host.cpu_cores {
            map.serialize_entry("physicalCPUs", &physical_cpus)?;
        }
        map.serialize_entry("preprocessedProfileVersion", &57)?;
        map.serialize_entry("processType", &0)?;
        map.serialize_entry("product", &self.product)?;
        map.serialize_entry("startTime", &self.start_time)?;
        map.serialize_entry("startTimeAsClockMonotonicNanosecondsSinceBoot", &0)?;
        map.serialize_entry("symbolicated", &true)?;
        map.serialize_entry("version", &28)?;
        map.serialize_entry(
            "sampleUnits",
            &json!({
                "time": "ms",
                "eventDelay": "ms",
                "threadCPUDelta": "µs",
            }),
        )?;
        map.serialize_entry("usesOnlyOneStackType", &true)?;
        map.serialize_entry("sourceCodeIsNotOnSearchfox", &true)?;
        map.serialize_entry(
            "extra",
            &json!([{
                "label": "Tracy info",
                "entries": [
                    { "label": "User", "format": "string", "value": self.host.user },
                    { "label": "Compiler", "format": "string", "value": self.host.compiler },
                    { "label": "Application info", "format": "string", "value": self.app_info },
                ],
            }]),
        )?;
        if let Some(imported_from) = &self.imported_from {
            map.serialize_entry("importedFrom", imported_from)?;
        }
        map.serialize_entry("initialSelectedThreads", &[self.main_thread_index])?;
        map.end()
    }
}

/// The assembled document: `{meta, libs, threads, counters, shared}`.
#[derive(Debug, Clone)]
pub struct Profile {
    meta: Meta,
    libs: LibTable,
    threads: Vec<ProfileThread>,
    counters: Vec<Counter>,
    string_table: StringTable,
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("meta", &self.meta)?;
        map.serialize_entry("libs", &self.libs)?;
        map.serialize_entry("threads", &self.threads)?;
        map.serialize_entry("counters", &self.counters)?;
        map.serialize_entry("shared", &SerializableShared(&self.string_table))?;
        map.end()
    }
}

struct SerializableShared<'a>(&'a StringTable);

impl Serialize for SerializableShared<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("stringArray", self.0)?;
        map.end()
    }
}

/// Converts a materialized trace into the processed profile document.
///
/// Per-thread tables are built against the shared string and library tables;
/// the collectors run in a fixed order, with frame markers attached to the
/// first thread only. GPU contexts follow as pseudo-threads, then counters.
pub fn build_profile(trace: &TraceData) -> Profile {
    let mut string_table = StringTable::new();
    let mut libs = LibTable::new();

    let product = if trace.capture_program.is_empty() {
        "Tracy".to_string()
    } else {
        trace.capture_program.clone()
    };

    let mut threads = Vec::with_capacity(trace.threads.len());
    let mut first_main = None;
    let mut first_main_with_capture_pid = None;

    for (index, td) in trace.threads.iter().enumerate() {
        let mut tables = ThreadTables::new();
        tables.collect_zones(trace, &td.timeline, &mut string_table, CategoryHandle::USER);
        tables.process_messages(trace, &mut string_table, CategoryHandle::MESSAGE, td.id);
        tables.process_locks(trace, &mut string_table, CategoryHandle::LOCK, td.id);
        tables.process_samples(
            trace,
            td,
            &mut string_table,
            &mut libs,
            CategoryHandle::USER,
            CategoryHandle::KERNEL,
        );
        tables.process_allocations(trace, &mut string_table, &mut libs, CategoryHandle::MEMORY);
        if index == 0 {
            tables.process_frames(trace, &mut string_table, CategoryHandle::FRAME);
        }

        let name = td
            .name
            .clone()
            .unwrap_or_else(|| format!("Thread {}", td.id));
        let pid = trace.pid_for_tid(td.id).unwrap_or(trace.pid);
        let is_main_thread = name == "Main thread" || pid == td.id;
        if is_main_thread {
            if first_main.is_none() {
                first_main = Some(index);
            }
            if pid == trace.pid && first_main_with_capture_pid.is_none() {
                first_main_with_capture_pid = Some(index);
            }
        }

        threads.push(ProfileThread {
            name,
            is_main_thread,
            process_type: "default",
            process_name: product.clone(),
            pid,
            tid: ProfileTid::Cpu(td.id),
            tables,
        });
    }

    let main_thread_index = first_main_with_capture_pid.or(first_main).unwrap_or(0);

    for ctx in &trace.gpu_contexts {
        for (&tid, timeline) in &ctx.thread_data {
            if timeline.is_empty() {
                continue;
            }
            let mut tables = ThreadTables::new();
            tables.collect_gpu_zones(trace, timeline, &mut string_table, CategoryHandle::GPU);
            if !tables.has_markers() {
                log::debug!("GPU timeline for tid {tid} produced no markers, skipping");
                continue;
            }

            let name = match ctx.name {
                Some(name) => trace.get_string(name).to_string(),
                None => format!("GPU ({})", ctx.kind.label()),
            };
            threads.push(ProfileThread {
                name,
                is_main_thread: false,
                process_type: "gpu",
                process_name: product.clone(),
                pid: trace.pid,
                tid: ProfileTid::Gpu(format!("gpu-{tid}")),
                tables,
            });
        }
    }

    let counters = build_counters(trace, main_thread_index);

    let meta = Meta {
        interval_ms: ns_to_ms(trace.sampling_period),
        start_time: trace.capture_time as f64 / 1_000.0,
        product,
        host: parse_host_info(&trace.host_info),
        app_info: app_info_string(trace),
        imported_from: (!trace.capture_name.is_empty()).then(|| trace.capture_name.clone()),
        main_thread_index,
    };

    Profile {
        meta,
        libs,
        threads,
        counters,
        string_table,
    }
}

/// Writes the document as compact JSON with a trailing newline.
pub fn write_profile<W: Write>(profile: &Profile, mut writer: W) -> std::io::Result<()> {
    serde_json::to_writer(&mut writer, profile)?;
    writer.write_all(b"\n")
}
