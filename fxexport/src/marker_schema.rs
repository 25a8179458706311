use serde_json::{json, Value};

/// The `meta.markerSchema` catalog: one schema per marker type describing the
/// display surfaces, label templates, and the typed fields of the marker's
/// `data` blob. Pure data; the collectors only have to emit matching keys.
pub fn marker_schemas() -> Value {
    let display = json!(["marker-chart", "marker-table", "timeline-overview"]);
    json!([
        {
            "name": "TracyZone",
            "display": display.clone(),
            "chartLabel": "{marker.data.name}",
            "tooltipLabel": "{marker.data.name}",
            "tableLabel": "{marker.data.name}",
            "description": "Tracy instrumentation zone",
            "colorField": "color",
            "fields": [
                { "key": "name", "label": "Name", "format": "unique-string" },
                { "key": "text", "label": "Text", "format": "unique-string" },
                { "key": "color", "label": "Color", "format": "string", "hide": true },
                { "key": "file", "label": "File", "format": "unique-string" },
                { "key": "line", "label": "Line", "format": "integer" },
                { "key": "function", "label": "Function", "format": "unique-string" },
            ],
        },
        {
            "name": "TracyMessage",
            "display": display.clone(),
            "chartLabel": "{marker.data.text}",
            "tooltipLabel": "{marker.data.text}",
            "tableLabel": "{marker.data.text}",
            "description": "Tracy log message",
            "colorField": "color",
            "fields": [
                { "key": "text", "label": "Message", "format": "unique-string" },
                { "key": "color", "label": "Color", "format": "string" },
            ],
        },
        {
            "name": "TracyLock",
            "display": display.clone(),
            "chartLabel": "{marker.data.name}",
            "tooltipLabel": "Lock: {marker.data.name} ({marker.data.operation})",
            "tableLabel": "{marker.data.name}",
            "description": "Tracy lock contention",
            "fields": [
                { "key": "name", "label": "Lock Name", "format": "unique-string" },
                { "key": "lockId", "label": "Lock ID", "format": "integer" },
                { "key": "operation", "label": "Operation", "format": "string" },
            ],
        },
        {
            "name": "TracyGpuZone",
            "display": display.clone(),
            "chartLabel": "{marker.data.name}",
            "tooltipLabel": "GPU: {marker.data.name}",
            "tableLabel": "{marker.data.name}",
            "description": "Tracy GPU zone",
            "fields": [
                { "key": "name", "label": "Name", "format": "unique-string" },
                { "key": "gpuStart", "label": "GPU Start", "format": "time" },
                { "key": "gpuEnd", "label": "GPU End", "format": "time" },
                { "key": "cpuStart", "label": "CPU Start", "format": "time" },
                { "key": "cpuEnd", "label": "CPU End", "format": "time" },
                { "key": "file", "label": "File", "format": "unique-string" },
                { "key": "line", "label": "Line", "format": "integer" },
                { "key": "function", "label": "Function", "format": "unique-string" },
            ],
        },
        {
            "name": "TracyFrame",
            "display": display.clone(),
            "chartLabel": "Frame {marker.data.frameNumber}",
            "tooltipLabel": "Frame {marker.data.frameNumber} ({marker.data.fps} FPS)",
            "tableLabel": "Frame {marker.data.frameNumber}",
            "description": "Tracy frame marker",
            "fields": [
                { "key": "name", "label": "Name", "format": "unique-string" },
                { "key": "frameNumber", "label": "Frame", "format": "integer" },
                { "key": "duration", "label": "Duration (ms)", "format": "duration" },
                { "key": "fps", "label": "FPS", "format": "number" },
            ],
        },
    ])
}
