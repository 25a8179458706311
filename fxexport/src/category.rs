use serde::ser::{Serialize, SerializeMap, Serializer};

/// Index into `meta.categories`.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct CategoryHandle(pub u32);

impl CategoryHandle {
    pub const OTHER: Self = CategoryHandle(0);
    pub const USER: Self = CategoryHandle(1);
    pub const KERNEL: Self = CategoryHandle(2);
    pub const GPU: Self = CategoryHandle(3);
    pub const LOCK: Self = CategoryHandle(4);
    pub const MESSAGE: Self = CategoryHandle(5);
    pub const FRAME: Self = CategoryHandle(6);
    pub const MEMORY: Self = CategoryHandle(7);
}

impl Serialize for CategoryHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub name: &'static str,
    pub color: &'static str,
}

/// The fixed category catalog. Indices match the `CategoryHandle` constants.
pub const CATEGORIES: [Category; 8] = [
    Category { name: "Other", color: "grey" },
    Category { name: "User", color: "yellow" },
    Category { name: "Kernel", color: "orange" },
    Category { name: "GPU", color: "green" },
    Category { name: "Lock", color: "red" },
    Category { name: "Message", color: "blue" },
    Category { name: "Frame", color: "purple" },
    Category { name: "Memory", color: "teal" },
];

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", self.name)?;
        map.serialize_entry("color", self.color)?;
        map.serialize_entry("subcategories", &["Other"])?;
        map.end()
    }
}
