use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::fast_hash_map::FastHashMap;

/// Index into the document's `libs` array.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct LibIndex(pub(crate) u32);

impl Serialize for LibIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

#[derive(Debug, Clone)]
struct LibEntry {
    name: String,
    start: u64,
    end: u64,
}

/// The document-scoped library table. Interning an image name registers the
/// library; observing symbols widens its `[start, end)` address range.
#[derive(Debug, Clone, Default)]
pub struct LibTable {
    libs: Vec<LibEntry>,
    index: FastHashMap<String, LibIndex>,
}

impl LibTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Interns an image name, widening the address range when `addr` is
    /// nonzero. Empty names do not touch the table.
    pub fn intern(&mut self, name: &str, addr: u64, size: u32) -> Option<LibIndex> {
        if name.is_empty() {
            return None;
        }
        if let Some(&idx) = self.index.get(name) {
            if addr != 0 {
                let lib = &mut self.libs[idx.0 as usize];
                let end = addr + size as u64;
                if lib.start == 0 || addr < lib.start {
                    lib.start = addr;
                }
                if end > lib.end {
                    lib.end = end;
                }
            }
            return Some(idx);
        }
        let idx = LibIndex(self.libs.len() as u32);
        self.libs.push(LibEntry {
            name: name.to_string(),
            start: addr,
            end: addr + size as u64,
        });
        self.index.insert(name.to_string(), idx);
        Some(idx)
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn range(&self, idx: LibIndex) -> (u64, u64) {
        let lib = &self.libs[idx.0 as usize];
        (lib.start, lib.end)
    }
}

impl Serialize for LibTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.libs.len()))?;
        for lib in &self.libs {
            seq.serialize_element(&SerializableLib(lib))?;
        }
        seq.end()
    }
}

struct SerializableLib<'a>(&'a LibEntry);

impl Serialize for SerializableLib<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let lib = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("arch", &())?;
        map.serialize_entry("name", &lib.name)?;
        map.serialize_entry("path", &lib.name)?;
        map.serialize_entry("debugName", &lib.name)?;
        map.serialize_entry("debugPath", &lib.name)?;
        map.serialize_entry("start", &lib.start)?;
        map.serialize_entry("end", &lib.end)?;
        map.serialize_entry("breakpadId", &())?;
        map.serialize_entry("codeId", &())?;
        map.end()
    }
}
