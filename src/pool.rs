//! Fixed-capacity object pools
//!
//! Hot-path bookkeeping (in-flight reads, parsed requests) is carved out of
//! pools instead of the general allocator.
//!
//! ## Behaviour
//! - Blocks are allocated lazily, never more than `capacity` of them
//! - A released block is reset to `T::default()` and parked on a bounded
//!   lock-free free list for reuse
//! - Once every block is checked out, `acquire` returns `None`: the caller
//!   must back off until something is released
//!
//! Handles are cheap to clone and may be shared across threads; a
//! [`Pooled`] block finds its way home when dropped, wherever that happens.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

/// A bounded pool of reusable `T` blocks
pub struct ObjectPool<T: Default> {
    inner: Arc<PoolInner<T>>,
}

struct PoolInner<T> {
    /// Name used in diagnostics
    name: &'static str,

    /// Maximum number of blocks ever allocated
    capacity: usize,

    /// Blocks allocated so far (never exceeds capacity)
    allocated: AtomicUsize,

    /// Blocks currently handed out
    in_use: AtomicUsize,

    /// Released blocks waiting to be reused
    free: ArrayQueue<Box<T>>,
}

impl<T: Default> ObjectPool<T> {
    /// Create an empty pool that will hand out at most `capacity` blocks
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "pool {name} needs a non-zero capacity");
        Self {
            inner: Arc::new(PoolInner {
                name,
                capacity,
                allocated: AtomicUsize::new(0),
                in_use: AtomicUsize::new(0),
                free: ArrayQueue::new(capacity),
            }),
        }
    }

    /// Check out a block in its default state
    ///
    /// Returns `None` when all blocks are in use.
    pub fn acquire(&self) -> Option<Pooled<T>> {
        let block = match self.inner.free.pop() {
            Some(block) => block,
            None => {
                // Claim an allocation slot before allocating
                let claimed = self
                    .inner
                    .allocated
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < self.inner.capacity).then_some(n + 1)
                    });
                if claimed.is_err() {
                    tracing::trace!(
                        pool = self.inner.name,
                        capacity = self.inner.capacity,
                        "pool exhausted"
                    );
                    return None;
                }
                Box::default()
            }
        };

        self.inner.in_use.fetch_add(1, Ordering::AcqRel);
        Some(Pooled {
            block: Some(block),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Return a block to the pool
    ///
    /// Same as dropping it; spelled out for call sites that want the
    /// release to be visible.
    pub fn release(&self, block: Pooled<T>) {
        debug_assert!(
            Arc::ptr_eq(&self.inner, &block.pool),
            "block released into a foreign pool"
        );
        drop(block);
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Blocks currently checked out
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Blocks that `acquire` could still hand out
    pub fn available(&self) -> usize {
        self.inner.capacity.saturating_sub(self.in_use())
    }
}

impl<T: Default> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.capacity)
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// A block checked out of an [`ObjectPool`]
///
/// Dropping it resets the block and returns it to the pool.
pub struct Pooled<T: Default> {
    block: Option<Box<T>>,
    pool: Arc<PoolInner<T>>,
}

impl<T: Default> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` empties the option
        self.block.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Default> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.block.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Default> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(mut block) = self.block.take() {
            *block = T::default();
            // Uncount before publishing so `in_use` never overshoots capacity
            self.pool.in_use.fetch_sub(1, Ordering::AcqRel);
            // Never more than `capacity` blocks exist, so this cannot overflow
            let _ = self.pool.free.push(block);
        }
    }
}

impl<T: Default + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
