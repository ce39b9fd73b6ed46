//! Diff-tracked value wrappers.

use std::any::Any;
use std::ops::{Deref, Index};

use crate::value::{DiffTracked, DiffTrackedSlots, SyncValue};

/// A value that remembers whether it changed since the last sync.
///
/// Every [`set`](Self::set) ORs the dirty flag with "did the value actually
/// differ"; the coordinator clears it after the value is written or read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tracked<T> {
    value: T,
    dirty: bool,
}

impl<T> Tracked<T> {
    /// Wraps `value` with a clear dirty flag.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    #[must_use]
    pub const fn get(&self) -> &T {
        &self.value
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces the next sync to send the value.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: PartialEq> Tracked<T> {
    /// Stores `value`, marking the wrapper dirty if it differs from the current one.
    pub fn set(&mut self, value: T) {
        self.dirty |= self.value != value;
        self.value = value;
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> From<T> for Tracked<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: SyncValue> DiffTracked for Tracked<T> {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn inner(&self) -> &dyn SyncValue {
        &self.value
    }

    fn inner_mut(&mut self) -> &mut dyn SyncValue {
        &mut self.value
    }
}

impl<T: SyncValue> SyncValue for Tracked<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_tracked(&self) -> Option<&dyn DiffTracked> {
        Some(self)
    }

    fn as_tracked_mut(&mut self) -> Option<&mut dyn DiffTracked> {
        Some(self)
    }
}

/// A fixed-length array with one dirty flag per slot.
///
/// The length is part of the schema and never changes after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedArray<T> {
    values: Box<[T]>,
    dirty: Box<[bool]>,
}

impl<T> TrackedArray<T> {
    /// Wraps `values` with every slot clean.
    #[must_use]
    pub fn new(values: impl Into<Vec<T>>) -> Self {
        let values = values.into().into_boxed_slice();
        let dirty = vec![false; values.len()].into_boxed_slice();
        Self { values, dirty }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    #[must_use]
    pub fn is_dirty(&self, index: usize) -> bool {
        self.dirty.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn any_dirty(&self) -> bool {
        self.dirty.iter().any(|d| *d)
    }

    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty.iter().filter(|d| **d).count()
    }

    /// Forces slot `index` to be sent on the next sync.
    pub fn mark_dirty(&mut self, index: usize) {
        if let Some(flag) = self.dirty.get_mut(index) {
            *flag = true;
        }
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|d| *d = false);
    }
}

impl<T: Clone> TrackedArray<T> {
    /// `len` clean copies of `value`.
    #[must_use]
    pub fn filled(value: T, len: usize) -> Self {
        Self::new(vec![value; len])
    }
}

impl<T: PartialEq> TrackedArray<T> {
    /// Stores `value` in slot `index`, marking the slot dirty if it changed.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: T) {
        self.dirty[index] |= self.values[index] != value;
        self.values[index] = value;
    }
}

impl<T> Index<usize> for TrackedArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.values[index]
    }
}

impl<'a, T> IntoIterator for &'a TrackedArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<T: SyncValue> DiffTrackedSlots for TrackedArray<T> {
    fn slot_count(&self) -> usize {
        self.values.len()
    }

    fn is_slot_dirty(&self, index: usize) -> bool {
        self.is_dirty(index)
    }

    fn any_dirty(&self) -> bool {
        Self::any_dirty(self)
    }

    fn clear_dirty(&mut self) {
        Self::clear_dirty(self);
    }

    fn slot(&self, index: usize) -> Option<&dyn SyncValue> {
        self.values.get(index).map(|v| v as &dyn SyncValue)
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut dyn SyncValue> {
        self.values.get_mut(index).map(|v| v as &mut dyn SyncValue)
    }
}

impl<T: SyncValue> SyncValue for TrackedArray<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_tracked_slots(&self) -> Option<&dyn DiffTrackedSlots> {
        Some(self)
    }

    fn as_tracked_slots_mut(&mut self) -> Option<&mut dyn DiffTrackedSlots> {
        Some(self)
    }
}
