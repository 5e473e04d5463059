//! Batch buffer management
//!
//! Layers never allocate their batch buffers directly: they go through a
//! [`BufferAllocator`] injected by the host, so the host can track or pool
//! per-layer memory. Buffers are named (`nnp:inpData0`, ...) and only grow.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use log::debug;

use crate::real::Real;

/// Smallest batch capacity ever allocated.
pub const MIN_BATCH_CAPACITY: usize = 8;

/// Round a requested batch size up to the capacity actually allocated.
///
/// Capacities are powers of two, so a slowly growing batch causes only a
/// logarithmic number of reallocations.
pub fn good_memory_size(n: usize) -> usize {
    n.max(MIN_BATCH_CAPACITY)
        .checked_next_power_of_two()
        .unwrap_or(n)
}

/// Named, resizable buffer provider.
pub trait BufferAllocator<T>: Send + Sync {
    /// Allocate a new buffer of `len` elements.
    fn create(&self, len: usize, name: &str) -> Vec<T>;

    /// Grow `buffer` to `len` elements, keeping its current content.
    fn grow(&self, buffer: &mut Vec<T>, len: usize, name: &str);

    /// Release a buffer obtained from `create`.
    fn destroy(&self, buffer: Vec<T>, name: &str);
}

/// Plain heap allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl<T: Real> BufferAllocator<T> for HeapAllocator {
    fn create(&self, len: usize, name: &str) -> Vec<T> {
        debug!("create {} ({} elements)", name, len);
        vec![T::ZERO; len]
    }

    fn grow(&self, buffer: &mut Vec<T>, len: usize, name: &str) {
        debug!("grow {} ({} -> {} elements)", name, buffer.len(), len);
        if len > buffer.len() {
            buffer.resize(len, T::ZERO);
        }
    }

    fn destroy(&self, buffer: Vec<T>, name: &str) {
        debug!("destroy {} ({} elements)", name, buffer.len());
        drop(buffer);
    }
}

/// Heap allocator that records live sizes per buffer name and counts calls.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    live: Mutex<HashMap<String, usize>>,
    creates: AtomicUsize,
    grows: AtomicUsize,
    destroys: AtomicUsize,
}

impl TrackingAllocator {
    /// Create an allocator with no live buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live element count of the buffer called `name`, if any.
    pub fn live_len(&self, name: &str) -> Option<usize> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// Sum of live element counts over all buffers.
    pub fn total_live(&self) -> usize {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    /// Number of `create` calls so far.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::Relaxed)
    }

    /// Number of `grow` calls so far.
    pub fn grow_count(&self) -> usize {
        self.grows.load(Ordering::Relaxed)
    }

    /// Number of `destroy` calls so far.
    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::Relaxed)
    }

    fn record(&self, name: &str, len: Option<usize>) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        match len {
            Some(len) => {
                live.insert(name.to_string(), len);
            }
            None => {
                live.remove(name);
            }
        }
    }
}

impl<T: Real> BufferAllocator<T> for TrackingAllocator {
    fn create(&self, len: usize, name: &str) -> Vec<T> {
        self.creates.fetch_add(1, Ordering::Relaxed);
        self.record(name, Some(len));
        HeapAllocator.create(len, name)
    }

    fn grow(&self, buffer: &mut Vec<T>, len: usize, name: &str) {
        self.grows.fetch_add(1, Ordering::Relaxed);
        self.record(name, Some(len.max(buffer.len())));
        HeapAllocator.grow(buffer, len, name);
    }

    fn destroy(&self, buffer: Vec<T>, name: &str) {
        self.destroys.fetch_add(1, Ordering::Relaxed);
        self.record(name, None);
        HeapAllocator.destroy(buffer, name);
    }
}

/// Batch-sized working buffer of one layer.
///
/// Holds `width` values per sample. The logical length is `width * rows`;
/// the allocation holds `width * capacity` values and never shrinks.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    name: String,
    width: usize,
    rows: usize,
    capacity: usize,
    data: Option<Vec<T>>,
}

impl<T: Real> BatchBuffer<T> {
    /// Create an unallocated buffer holding `width` values per sample.
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
            rows: 0,
            capacity: 0,
            data: None,
        }
    }

    /// Whether `ensure_capacity` has allocated the buffer.
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Make room for `capacity` samples: create if absent, grow if smaller.
    pub fn ensure_capacity(&mut self, capacity: usize, allocator: &dyn BufferAllocator<T>) {
        if self.data.is_some() && capacity <= self.capacity {
            return;
        }

        let len = self.width * capacity;
        match self.data.as_mut() {
            Some(data) => allocator.grow(data, len, &self.name),
            None => self.data = Some(allocator.create(len, &self.name)),
        }
        self.capacity = capacity;
    }

    /// Set the logical number of samples. Clamped to the capacity.
    pub fn set_rows(&mut self, rows: usize) {
        self.rows = rows.min(self.capacity);
    }

    /// Values of the current rows.
    pub fn as_slice(&self) -> &[T] {
        match &self.data {
            Some(data) => &data[..self.width * self.rows],
            None => &[],
        }
    }

    /// Mutable values of the current rows.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.width * self.rows;
        match &mut self.data {
            Some(data) => &mut data[..len],
            None => &mut [],
        }
    }

    /// Hand the allocation back to `allocator`.
    pub fn release(&mut self, allocator: &dyn BufferAllocator<T>) {
        if let Some(data) = self.data.take() {
            allocator.destroy(data, &self.name);
        }
        self.rows = 0;
        self.capacity = 0;
    }
}
