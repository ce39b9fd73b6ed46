//! Runtime view of a synchronized field value.

use std::any::Any;

/// A value that a serializer can size, write and read in place.
///
/// Serializers are resolved by the field's declared [`ValueType`](schema::ValueType)
/// and downcast the value to the Rust type they expect. Diff-tracked wrappers
/// additionally expose their dirty state through [`as_tracked`](Self::as_tracked)
/// or [`as_tracked_slots`](Self::as_tracked_slots).
pub trait SyncValue: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_tracked(&self) -> Option<&dyn DiffTracked> {
        None
    }

    fn as_tracked_mut(&mut self) -> Option<&mut dyn DiffTracked> {
        None
    }

    fn as_tracked_slots(&self) -> Option<&dyn DiffTrackedSlots> {
        None
    }

    fn as_tracked_slots_mut(&mut self) -> Option<&mut dyn DiffTrackedSlots> {
        None
    }
}

impl dyn SyncValue {
    #[must_use]
    pub fn downcast_ref<T: SyncValue>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: SyncValue>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// A single value with a changed-since-last-sync flag.
pub trait DiffTracked {
    fn is_dirty(&self) -> bool;

    fn clear_dirty(&mut self);

    fn inner(&self) -> &dyn SyncValue;

    /// Mutable access for decoding; does not mark the value dirty.
    fn inner_mut(&mut self) -> &mut dyn SyncValue;
}

/// A fixed-length sequence with one dirty flag per slot.
pub trait DiffTrackedSlots {
    fn slot_count(&self) -> usize;

    fn is_slot_dirty(&self, index: usize) -> bool;

    fn any_dirty(&self) -> bool {
        (0..self.slot_count()).any(|i| self.is_slot_dirty(i))
    }

    fn clear_dirty(&mut self);

    fn slot(&self, index: usize) -> Option<&dyn SyncValue>;

    /// Mutable access for decoding; does not mark the slot dirty.
    fn slot_mut(&mut self, index: usize) -> Option<&mut dyn SyncValue>;
}

macro_rules! impl_sync_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl SyncValue for $t {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }
            }

            impl SyncValue for Vec<$t> {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }
            }
        )*
    };
}

impl_sync_value!(bool, u8, i8, i16, u16, i32, u32, i64, u64, f32, f64);
