use std::ops::Deref;
use std::sync::Arc;

/// Immutable view of the series at the moment it was taken.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series(Arc<Vec<f32>>);

impl Deref for Series {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Append-only store of emitted values.
///
/// Snapshots share the buffer; an append made while a snapshot is alive copies
/// the buffer first, so a snapshot never observes later writes.
#[derive(Debug, Default)]
pub struct SeriesStore {
    values: Arc<Vec<f32>>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, value: f32) {
        Arc::make_mut(&mut self.values).push(value);
    }

    pub fn clear(&mut self) {
        self.values = Arc::new(Vec::new());
    }

    pub fn snapshot(&self) -> Series {
        Series(Arc::clone(&self.values))
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
