//! Per-task scratch storage
//!
//! Each range task accumulates into its own [`ScratchBlock`], one typed slot
//! per extractor. Blocks from sibling tasks are merged pairwise in range
//! order, so per-element writes recorded in [`SlotRuns`] land in the output
//! exactly as a sequential scan would produce them.

use std::any::Any;

/// Typed merge of one task's accumulation into another's.
pub trait TaskMerge: Send + 'static {
    fn merge(&mut self, other: Self);
}

impl TaskMerge for () {
    fn merge(&mut self, _other: Self) {}
}

impl<T: Send + 'static> TaskMerge for Vec<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<A: TaskMerge, B: TaskMerge> TaskMerge for (A, B) {
    fn merge(&mut self, other: Self) {
        self.0.merge(other.0);
        self.1.merge(other.1);
    }
}

/// Element writes recorded as contiguous runs of output slots.
///
/// A range task visits increasing indices, so each task usually produces a
/// single run and merging is a cheap append.
#[derive(Clone, Debug)]
pub struct SlotRuns<T> {
    runs: Vec<(usize, Vec<T>)>,
}

impl<T> Default for SlotRuns<T> {
    fn default() -> Self {
        Self { runs: Vec::new() }
    }
}

impl<T: Copy> SlotRuns<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for output slot `index`.
    pub fn set(&mut self, index: usize, value: T) {
        if let Some((start, values)) = self.runs.last_mut() {
            if *start + values.len() == index {
                values.push(value);
                return;
            }
        }
        self.runs.push((index, vec![value]));
    }

    /// Record consecutive values starting at `index`.
    pub fn set_many(&mut self, index: usize, values: &[T]) {
        for (i, &v) in values.iter().enumerate() {
            self.set(index + i, v);
        }
    }

    /// Number of recorded writes
    pub fn len(&self) -> usize {
        self.runs.iter().map(|(_, v)| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Copy every recorded value into `dst`; later writes to a slot win.
    ///
    /// Writes past the end of `dst` are dropped.
    pub fn scatter_into(&self, dst: &mut [T]) {
        for (start, values) in &self.runs {
            if *start >= dst.len() {
                continue;
            }
            let end = (*start + values.len()).min(dst.len());
            dst[*start..end].copy_from_slice(&values[..end - *start]);
        }
    }

    /// Visit every recorded `(slot, value)` pair in write order.
    pub fn for_each(&self, mut f: impl FnMut(usize, T)) {
        for (start, values) in &self.runs {
            for (i, &v) in values.iter().enumerate() {
                f(start + i, v);
            }
        }
    }
}

impl<T: Copy + Send + 'static> TaskMerge for SlotRuns<T> {
    fn merge(&mut self, other: Self) {
        for (start, values) in other.runs {
            match self.runs.last_mut() {
                Some((s, v)) if *s + v.len() == start => v.extend(values),
                _ => self.runs.push((start, values)),
            }
        }
    }
}

/// Type-erased shared data produced by an extractor's `init`.
pub type ExtractData = Box<dyn Any + Send + Sync>;

/// Type-erased task accumulator.
pub type TaskSlot = Box<dyn Any + Send>;

/// Scratch of one range task: one optional slot per extractor of the run.
#[derive(Default)]
pub struct ScratchBlock {
    slots: Vec<Option<TaskSlot>>,
}

impl ScratchBlock {
    pub fn with_len(len: usize) -> Self {
        Self { slots: (0..len).map(|_| None).collect() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn insert(&mut self, index: usize, slot: TaskSlot) {
        self.slots[index] = Some(slot);
    }

    pub fn take(&mut self, index: usize) -> Option<TaskSlot> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TaskSlot> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Typed view of slot `index`.
    pub fn typed_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.get_mut(index).and_then(|slot| slot.downcast_mut::<T>())
    }
}

impl std::fmt::Debug for ScratchBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchBlock")
            .field("slots", &self.slots.iter().filter(|s| s.is_some()).count())
            .finish()
    }
}
