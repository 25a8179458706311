use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A parallel column projected out of a table's row storage.
pub struct Column<'a, T, F>(pub &'a [T], pub F);

impl<T, U, F> Serialize for Column<'_, T, F>
where
    U: Serialize,
    F: Fn(&T) -> U,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(&self.1))
    }
}

/// A column whose every entry holds the same value.
pub struct SingleValueColumn<T: Serialize>(pub T, pub usize);

impl<T: Serialize> Serialize for SingleValueColumn<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.1))?;
        for _ in 0..self.1 {
            seq.serialize_element(&self.0)?;
        }
        seq.end()
    }
}
