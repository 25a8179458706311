use assert_json_diff::assert_json_eq;
use serde_json::{json, Value};

use fxexport::build_profile;
use tracy_trace::{
    CallstackFrame, CallstackFrameData, CallstackFrameId, CallstackId, FrameEvent, FrameSeries,
    GpuContext, GpuContextKind, GpuTimeline, GpuZone, MemEvent, MemoryNamespace, PlotData,
    PlotItem, PlotType, SampleData, SourceLocation, SrcLocId, StringRef, ThreadData, TraceData,
    Zone, ZoneTimeline,
};

fn to_value(trace: &TraceData) -> Value {
    serde_json::to_value(build_profile(trace)).unwrap()
}

fn string_array(profile: &Value) -> Vec<String> {
    profile["shared"]["stringArray"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect()
}

fn plain_zone(start: i64, end: i64, src_loc: u32) -> Zone {
    Zone {
        start,
        end,
        src_loc: SrcLocId(src_loc),
        extra: None,
        children: ZoneTimeline::default(),
    }
}

/// One source location whose file and function are empty so zone markers
/// carry only their name.
fn named_src_locs(names: &[&str]) -> (Vec<String>, Vec<SourceLocation>) {
    let mut strings: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    let empty = StringRef(strings.len() as u32);
    strings.push(String::new());
    let locs = (0..names.len())
        .map(|i| SourceLocation {
            name: Some(StringRef(i as u32)),
            function: empty,
            file: empty,
            line: 0,
        })
        .collect();
    (strings, locs)
}

#[test]
fn empty_trace() {
    let profile = to_value(&TraceData::default());

    assert_eq!(profile["meta"]["version"], json!(28));
    assert_eq!(profile["meta"]["preprocessedProfileVersion"], json!(57));
    assert_json_eq!(profile["threads"].clone(), json!([]));
    assert_json_eq!(profile["counters"].clone(), json!([]));
    assert_json_eq!(profile["libs"].clone(), json!([]));
    assert_json_eq!(profile["shared"]["stringArray"].clone(), json!([]));
}

#[test]
fn single_zone() {
    let (strings, source_locations) = named_src_locs(&["work"]);
    let trace = TraceData {
        pid: 7,
        strings,
        source_locations,
        threads: vec![ThreadData {
            id: 7,
            name: Some("Main thread".into()),
            timeline: ZoneTimeline::Magic(vec![plain_zone(1_000_000, 3_000_000, 0)]),
            samples: vec![],
        }],
        ..TraceData::default()
    };

    let profile = to_value(&trace);

    assert_eq!(profile["threads"].as_array().unwrap().len(), 1);
    let thread = &profile["threads"][0];
    assert_eq!(thread["isMainThread"], json!(true));
    assert_eq!(thread["tid"], json!(7));
    assert_eq!(thread["pid"], json!("7"));
    assert_eq!(thread["markers"]["length"], json!(1));
    assert_json_eq!(thread["markers"]["startTime"].clone(), json!([1.0]));
    assert_json_eq!(thread["markers"]["endTime"].clone(), json!([3.0]));
    assert_json_eq!(thread["markers"]["phase"].clone(), json!([1]));

    let strings = string_array(&profile);
    assert!(strings.iter().any(|s| s == "work"));
    assert!(strings.iter().any(|s| s == "TracyZone"));

    assert_json_eq!(profile["meta"]["initialSelectedThreads"].clone(), json!([0]));
}

#[test]
fn nested_zones() {
    let (strings, source_locations) = named_src_locs(&["parent", "child"]);
    let parent = Zone {
        children: ZoneTimeline::Magic(vec![plain_zone(2_000_000, 8_000_000, 1)]),
        ..plain_zone(0, 10_000_000, 0)
    };
    let trace = TraceData {
        pid: 1,
        strings,
        source_locations,
        threads: vec![ThreadData {
            id: 1,
            name: Some("Main thread".into()),
            timeline: ZoneTimeline::Magic(vec![parent]),
            samples: vec![],
        }],
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let thread = &profile["threads"][0];

    assert_eq!(thread["markers"]["length"], json!(2));
    assert_json_eq!(thread["markers"]["startTime"].clone(), json!([0.0, 2.0]));
    assert_json_eq!(thread["markers"]["endTime"].clone(), json!([10.0, 8.0]));
    assert_eq!(thread["registerTime"], json!(0.0));
    assert_eq!(thread["unregisterTime"], json!(10.0));
}

fn leaf_frame(name: StringRef, sym_addr: u64) -> CallstackFrameData {
    CallstackFrameData {
        data: vec![CallstackFrame {
            name,
            file: name,
            line: 0,
            sym_addr,
        }],
        image_name: None,
    }
}

fn sampled_trace(callstacks: Vec<Vec<CallstackFrameId>>, samples: Vec<SampleData>) -> TraceData {
    let a = CallstackFrameId(0x1000);
    let b = CallstackFrameId(0x2000);
    let c = CallstackFrameId(0x3000);
    TraceData {
        pid: 1,
        strings: vec!["A".into(), "B".into(), "C".into()],
        callstacks,
        callstack_frames: [
            (a.0, leaf_frame(StringRef(0), a.0)),
            (b.0, leaf_frame(StringRef(1), b.0)),
            (c.0, leaf_frame(StringRef(2), c.0)),
        ]
        .into_iter()
        .collect(),
        threads: vec![ThreadData {
            id: 1,
            name: Some("Main thread".into()),
            timeline: ZoneTimeline::default(),
            samples,
        }],
        ..TraceData::default()
    }
}

#[test]
fn one_sample_with_two_frame_callstack() {
    let a = CallstackFrameId(0x1000);
    let b = CallstackFrameId(0x2000);
    // Callstacks are innermost-first: B is the leaf, A the root.
    let trace = sampled_trace(
        vec![vec![], vec![b, a]],
        vec![SampleData {
            time: 2_500_000,
            callstack: CallstackId(1),
        }],
    );

    let profile = to_value(&trace);
    let thread = &profile["threads"][0];
    let strings = string_array(&profile);

    assert_eq!(thread["frameTable"]["length"], json!(2));
    assert_eq!(thread["stackTable"]["length"], json!(2));
    assert_json_eq!(thread["stackTable"]["prefix"].clone(), json!([null, 0]));
    assert_json_eq!(thread["stackTable"]["frame"].clone(), json!([0, 1]));
    assert_json_eq!(thread["samples"]["stack"].clone(), json!([1]));
    assert_json_eq!(thread["samples"]["timeDeltas"].clone(), json!([2.5]));
    assert_json_eq!(thread["samples"]["weight"].clone(), json!([1.0]));

    // The outermost frame was added first, so frame 0 is A.
    let func0 = thread["frameTable"]["func"][0].as_u64().unwrap() as usize;
    let name0 = thread["funcTable"]["name"][func0].as_u64().unwrap() as usize;
    assert_eq!(strings[name0], "A");
}

#[test]
fn shared_prefix_across_samples() {
    let a = CallstackFrameId(0x1000);
    let b = CallstackFrameId(0x2000);
    let c = CallstackFrameId(0x3000);
    let trace = sampled_trace(
        vec![vec![], vec![b, a], vec![c, a]],
        vec![
            SampleData { time: 1_000_000, callstack: CallstackId(1) },
            SampleData { time: 2_000_000, callstack: CallstackId(2) },
        ],
    );

    let profile = to_value(&trace);
    let thread = &profile["threads"][0];

    assert_eq!(thread["frameTable"]["length"], json!(3));
    assert_eq!(thread["stackTable"]["length"], json!(3));
    // One row for A, one for A -> B, one for A -> C, sharing A's row.
    assert_json_eq!(thread["stackTable"]["prefix"].clone(), json!([null, 0, 0]));
    assert_json_eq!(thread["samples"]["stack"].clone(), json!([1, 2]));
    assert_json_eq!(thread["samples"]["timeDeltas"].clone(), json!([1.0, 1.0]));
}

#[test]
fn paired_alloc_and_free() {
    let trace = TraceData {
        pid: 5,
        thread_compression: vec![5],
        threads: vec![ThreadData {
            id: 5,
            name: Some("Main thread".into()),
            timeline: ZoneTimeline::default(),
            samples: vec![],
        }],
        memory: [(
            0u64,
            MemoryNamespace {
                events: vec![MemEvent {
                    time_alloc: 1_000_000,
                    time_free: 5_000_000,
                    size: 64,
                    ptr: 0xDEAD_BEEF,
                    cs_alloc: CallstackId::NONE,
                    cs_free: CallstackId::NONE,
                    thread_alloc: 0,
                    thread_free: 0,
                }],
            },
        )]
        .into_iter()
        .collect(),
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let allocations = &profile["threads"][0]["nativeAllocations"];

    assert_eq!(allocations["length"], json!(2));
    assert_json_eq!(allocations["time"].clone(), json!([1.0, 5.0]));
    assert_json_eq!(allocations["weight"].clone(), json!([64, -64]));
    assert_json_eq!(
        allocations["memoryAddress"].clone(),
        json!([0xDEAD_BEEFu32, 0xDEAD_BEEFu32])
    );
    assert_json_eq!(allocations["threadId"].clone(), json!([5, 5]));
    assert_eq!(allocations["weightType"], json!("bytes"));
}

#[test]
fn gpu_contexts_become_pseudo_threads() {
    let (strings, source_locations) = named_src_locs(&["draw"]);
    let gpu_zone = GpuZone {
        gpu_start: 1_000_000,
        gpu_end: 4_000_000,
        cpu_start: 900_000,
        cpu_end: 1_100_000,
        src_loc: SrcLocId(0),
        name: None,
        children: GpuTimeline::default(),
    };
    let trace = TraceData {
        pid: 1,
        strings,
        source_locations,
        threads: vec![ThreadData {
            id: 1,
            name: Some("Main thread".into()),
            timeline: ZoneTimeline::default(),
            samples: vec![],
        }],
        gpu_contexts: vec![
            GpuContext {
                name: None,
                kind: GpuContextKind::Vulkan,
                thread_data: [(9u64, GpuTimeline::Magic(vec![gpu_zone]))].into_iter().collect(),
            },
            // A context whose only timeline is empty is skipped entirely.
            GpuContext {
                name: None,
                kind: GpuContextKind::OpenGl,
                thread_data: [(10u64, GpuTimeline::default())].into_iter().collect(),
            },
        ],
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let threads = profile["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 2);

    let gpu_thread = &threads[1];
    assert_eq!(gpu_thread["processType"], json!("gpu"));
    assert_eq!(gpu_thread["tid"], json!("gpu-9"));
    assert_eq!(gpu_thread["pid"], json!("1"));
    assert_eq!(gpu_thread["name"], json!("GPU (Vulkan)"));
    assert_eq!(gpu_thread["isMainThread"], json!(false));
    assert_eq!(gpu_thread["markers"]["length"], json!(1));
    let data = &gpu_thread["markers"]["data"][0];
    assert_eq!(data["type"], json!("TracyGpuZone"));
    assert_eq!(data["gpuStart"], json!(1.0));
    assert_eq!(data["gpuEnd"], json!(4.0));
    assert_eq!(data["cpuStart"], json!(0.9));
    assert_eq!(data["cpuEnd"], json!(1.1));
}

#[test]
fn frame_markers_only_on_first_thread() {
    let trace = TraceData {
        pid: 1,
        strings: vec!["Frame".into()],
        threads: vec![
            ThreadData {
                id: 1,
                name: Some("Main thread".into()),
                timeline: ZoneTimeline::default(),
                samples: vec![],
            },
            ThreadData {
                id: 2,
                name: Some("Worker".into()),
                timeline: ZoneTimeline::default(),
                samples: vec![],
            },
        ],
        frame_series: vec![FrameSeries {
            name: StringRef(0),
            frames: vec![
                FrameEvent { start: 0, end: 16_000_000 },
                FrameEvent { start: 16_000_000, end: -1 },
            ],
        }],
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let threads = profile["threads"].as_array().unwrap();

    assert_eq!(threads[0]["markers"]["length"], json!(1));
    assert_eq!(threads[1]["markers"]["length"], json!(0));
    let data = &threads[0]["markers"]["data"][0];
    assert_eq!(data["type"], json!("TracyFrame"));
    assert_eq!(data["frameNumber"], json!(0));
    assert_eq!(data["duration"], json!(16.0));
    assert_eq!(data["fps"], json!(62.5));
}

#[test]
fn main_thread_selection_prefers_the_capture_pid() {
    let trace = TraceData {
        pid: 100,
        threads: vec![
            ThreadData { id: 50, name: Some("Worker".into()), ..ThreadData::default() },
            ThreadData { id: 60, name: Some("Main thread".into()), ..ThreadData::default() },
            ThreadData { id: 100, name: None, ..ThreadData::default() },
        ],
        pid_map: [(50u64, 100u64), (60u64, 999u64)].into_iter().collect(),
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let threads = profile["threads"].as_array().unwrap();

    assert_eq!(threads[0]["isMainThread"], json!(false));
    assert_eq!(threads[1]["isMainThread"], json!(true));
    assert_eq!(threads[1]["pid"], json!("999"));
    // No reader-provided name falls back to "Thread <tid>".
    assert_eq!(threads[2]["name"], json!("Thread 100"));
    assert_eq!(threads[2]["isMainThread"], json!(true));
    // tid 100 is main *and* belongs to the capture pid, so it wins.
    assert_json_eq!(profile["meta"]["initialSelectedThreads"].clone(), json!([2]));
}

#[test]
fn meta_reflects_host_info_and_capture_identity() {
    let trace = TraceData {
        capture_name: "capture-2024.tracy".into(),
        capture_program: "game.exe".into(),
        capture_time: 1_700_000_000_000_000_000,
        sampling_period: 125_000,
        host_info: "OS: Linux 6.1\nCompiler: clang 18.1.0\nUser: ci\nArch: aarch64\nCPU: Apple M2\nCPU cores: 8\nRAM: 16384 MB\n".into(),
        strings: vec!["v1.2.3".into()],
        app_info: vec![StringRef(0)],
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let meta = &profile["meta"];

    assert_eq!(meta["product"], json!("game.exe"));
    assert_eq!(meta["importedFrom"], json!("capture-2024.tracy"));
    assert_eq!(meta["interval"], json!(0.125));
    assert_eq!(meta["startTime"], json!(1_700_000_000_000_000_000i64 as f64 / 1000.0));
    assert_eq!(meta["abi"], json!("aarch64-clang 18.1.0"));
    assert_eq!(meta["oscpu"], json!("Linux 6.1"));
    assert_eq!(meta["platform"], json!("Linux 6.1"));
    assert_eq!(meta["CPUName"], json!("Apple M2"));
    assert_eq!(meta["physicalCPUs"], json!(8));
    assert_eq!(meta["mainMemory"], json!(16384u64 * 1024 * 1024));
    assert_eq!(meta["symbolicated"], json!(true));
    assert_eq!(meta["usesOnlyOneStackType"], json!(true));

    let extra = &meta["extra"][0];
    assert_eq!(extra["label"], json!("Tracy info"));
    let entries = extra["entries"].as_array().unwrap();
    assert_eq!(entries[0]["value"], json!("ci"));
    assert_eq!(entries[1]["value"], json!("clang 18.1.0"));
    assert_eq!(entries[2]["value"], json!("v1.2.3"));

    let schema_names: Vec<&str> = meta["markerSchema"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        schema_names,
        vec!["TracyZone", "TracyMessage", "TracyLock", "TracyGpuZone", "TracyFrame"]
    );
}

#[test]
fn counters_carry_delta_encoded_plot_data() {
    let trace = TraceData {
        pid: 11,
        strings: vec!["heap".into()],
        threads: vec![ThreadData {
            id: 11,
            name: Some("Main thread".into()),
            ..ThreadData::default()
        }],
        plots: vec![PlotData {
            name: StringRef(0),
            kind: PlotType::Memory,
            data: vec![
                PlotItem { time: 1_000_000, val: 1000.0 },
                PlotItem { time: 2_000_000, val: 1250.0 },
            ],
        }],
        ..TraceData::default()
    };

    let profile = to_value(&trace);
    let counters = profile["counters"].as_array().unwrap();
    assert_eq!(counters.len(), 1);
    let counter = &counters[0];
    assert_eq!(counter["name"], json!("heap"));
    assert_eq!(counter["category"], json!("Memory"));
    assert_eq!(counter["pid"], json!("11"));
    assert_eq!(counter["mainThreadIndex"], json!(0));
    assert_json_eq!(counter["samples"]["time"].clone(), json!([1.0, 2.0]));
    assert_json_eq!(counter["samples"]["count"].clone(), json!([1000.0, 250.0]));
    assert_eq!(counter["samples"]["length"], json!(2));
}

fn assert_parallel_columns(table: &Value, columns: &[&str]) {
    let length = table["length"].as_u64().unwrap() as usize;
    for &column in columns {
        let array = table[column]
            .as_array()
            .unwrap_or_else(|| panic!("column {column} missing"));
        assert_eq!(array.len(), length, "column {column} length mismatch");
    }
}

#[test]
fn every_table_has_matching_parallel_column_lengths() {
    let a = CallstackFrameId(0x1000);
    let b = CallstackFrameId(0x2000);
    let mut trace = sampled_trace(
        vec![vec![], vec![b, a]],
        vec![
            SampleData { time: 1_000_000, callstack: CallstackId(1) },
            SampleData { time: 2_000_000, callstack: CallstackId(1) },
        ],
    );
    trace.thread_compression = vec![1];
    trace.memory = [(
        0u64,
        MemoryNamespace {
            events: vec![MemEvent {
                time_alloc: 500_000,
                time_free: 1_500_000,
                size: 128,
                ptr: 0x10,
                cs_alloc: CallstackId(1),
                cs_free: CallstackId(1),
                thread_alloc: 0,
                thread_free: 0,
            }],
        },
    )]
    .into_iter()
    .collect();

    let profile = to_value(&trace);
    let thread = &profile["threads"][0];

    assert_parallel_columns(
        &thread["frameTable"],
        &["address", "category", "subcategory", "func", "nativeSymbol", "innerWindowID", "line", "column", "inlineDepth"],
    );
    assert_parallel_columns(
        &thread["funcTable"],
        &["name", "isJS", "relevantForJS", "resource", "fileName", "lineNumber", "columnNumber"],
    );
    assert_parallel_columns(
        &thread["nativeSymbols"],
        &["libIndex", "address", "name", "functionSize"],
    );
    assert_parallel_columns(&thread["resourceTable"], &["lib", "name", "host", "type"]);
    assert_parallel_columns(&thread["stackTable"], &["prefix", "frame"]);
    assert_parallel_columns(
        &thread["samples"],
        &["stack", "timeDeltas", "weight", "threadCPUDelta"],
    );
    assert_parallel_columns(
        &thread["nativeAllocations"],
        &["time", "weight", "stack", "memoryAddress", "threadId"],
    );
    assert_parallel_columns(
        &thread["markers"],
        &["category", "data", "name", "startTime", "endTime", "phase"],
    );

    // Stack prefixes always point at earlier rows, so chains terminate.
    let prefixes = thread["stackTable"]["prefix"].as_array().unwrap();
    for (i, prefix) in prefixes.iter().enumerate() {
        if let Some(p) = prefix.as_u64() {
            assert!((p as usize) < i);
        }
    }

    // Reconstructed sample times are nondecreasing.
    let deltas = thread["samples"]["timeDeltas"].as_array().unwrap();
    let mut acc = 0.0;
    let mut last = f64::MIN;
    for delta in deltas {
        acc += delta.as_f64().unwrap();
        assert!(acc >= last);
        last = acc;
    }

    // Allocation times are nondecreasing.
    let times = thread["nativeAllocations"]["time"].as_array().unwrap();
    let mut last = f64::MIN;
    for time in times {
        let time = time.as_f64().unwrap();
        assert!(time >= last);
        last = time;
    }
}

#[test]
fn frames_and_native_symbols_agree_on_names() {
    let a = CallstackFrameId(0x1000);
    let b = CallstackFrameId(0x2000);
    let trace = sampled_trace(
        vec![vec![], vec![b, a]],
        vec![SampleData { time: 1_000_000, callstack: CallstackId(1) }],
    );

    let profile = to_value(&trace);
    let thread = &profile["threads"][0];

    let frame_count = thread["frameTable"]["length"].as_u64().unwrap() as usize;
    for i in 0..frame_count {
        let func = thread["frameTable"]["func"][i].as_u64().unwrap() as usize;
        let native = thread["frameTable"]["nativeSymbol"][i].as_u64().unwrap() as usize;
        assert_eq!(
            thread["funcTable"]["name"][func],
            thread["nativeSymbols"]["name"][native]
        );
        assert_eq!(
            thread["frameTable"]["address"][i],
            thread["nativeSymbols"]["address"][native]
        );
    }
}
