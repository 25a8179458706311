use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use crate::error::TraceError;
use crate::model::TraceData;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a capture being materialized on a background thread.
///
/// The derived indices (source-location zones, callstack samples) only become
/// usable once the corresponding readiness predicate reports true. Consumers
/// either poll the predicates themselves or call [`Worker::wait_until_ready`],
/// which polls at a short interval and hands out the loaded [`TraceData`].
pub struct Worker {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    trace: OnceLock<TraceData>,
    error: OnceLock<TraceError>,
    source_location_zones_ready: AtomicBool,
    callstack_samples_ready: AtomicBool,
}

impl Worker {
    /// Opens a serialized capture and starts materializing it in the
    /// background. Failure to open the file is reported immediately; decode
    /// failures surface from [`Worker::wait_until_ready`].
    pub fn open(path: &Path) -> Result<Worker, TraceError> {
        let file = File::open(path)
            .map_err(|e| TraceError::Open(path.to_owned(), e.to_string()))?;
        let inner = Arc::new(Inner::default());
        let loader = Arc::clone(&inner);
        thread::spawn(move || {
            match bincode::deserialize_from(BufReader::new(file)) {
                Ok(trace) => {
                    let _ = loader.trace.set(trace);
                    log::debug!("trace materialized");
                }
                Err(e) => {
                    let _ = loader.error.set(TraceError::Decode(e.to_string()));
                }
            }
            loader
                .source_location_zones_ready
                .store(true, Ordering::Release);
            loader.callstack_samples_ready.store(true, Ordering::Release);
        });
        Ok(Worker { inner })
    }

    /// Wraps an already-materialized model; both readiness predicates report
    /// true immediately.
    pub fn from_data(trace: TraceData) -> Worker {
        let inner = Inner::default();
        let _ = inner.trace.set(trace);
        inner.source_location_zones_ready.store(true, Ordering::Release);
        inner.callstack_samples_ready.store(true, Ordering::Release);
        Worker {
            inner: Arc::new(inner),
        }
    }

    pub fn source_location_zones_ready(&self) -> bool {
        self.inner.source_location_zones_ready.load(Ordering::Acquire)
    }

    pub fn callstack_samples_ready(&self) -> bool {
        self.inner.callstack_samples_ready.load(Ordering::Acquire)
    }

    /// Polls both readiness predicates at a short interval, then returns the
    /// materialized trace or the error the loader ran into.
    pub fn wait_until_ready(&self) -> Result<&TraceData, TraceError> {
        while !(self.source_location_zones_ready() && self.callstack_samples_ready()) {
            thread::sleep(READY_POLL_INTERVAL);
        }
        match self.inner.trace.get() {
            Some(trace) => Ok(trace),
            None => Err(self
                .inner
                .error
                .get()
                .cloned()
                .unwrap_or_else(|| TraceError::Decode("loader produced no trace".into()))),
        }
    }
}

impl TraceData {
    /// Writes the capture container consumed by [`Worker::open`].
    pub fn save(&self, path: &Path) -> Result<(), TraceError> {
        let file = File::create(path)
            .map_err(|e| TraceError::Write(path.to_owned(), e.to_string()))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| TraceError::Write(path.to_owned(), e.to_string()))
    }
}
