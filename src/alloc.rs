//! Byte-budget admission control for vector allocations.
//!
//! Arrow owns the raw buffers; the allocator is the capability through
//! which builders and grid cells *charge* their growth, so a caller can
//! bound the memory a query pipeline may pin. Exhaustion is a recoverable
//! error surfaced to the caller, never an abort.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::error::{Error, Result};

/// A cheaply cloneable handle to one byte budget.
///
/// All columns, relations, and grids built against the same handle share
/// the budget. Cloning the handle does not split the budget.
#[derive(Clone, Debug)]
pub struct BufferAllocator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    budget: usize,
    in_use: AtomicUsize,
}

impl BufferAllocator {
    /// An allocator that admits every reservation.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::with_budget(usize::MAX)
    }

    /// An allocator that admits at most `budget` bytes at a time.
    #[must_use]
    pub fn with_budget(budget: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                budget,
                in_use: AtomicUsize::new(0),
            }),
        }
    }

    /// Open a reservation charged with `bytes` up front.
    ///
    /// The reservation releases everything it holds when dropped, on all
    /// exit paths.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget cannot admit
    /// `bytes`.
    pub fn reserve(&self, bytes: usize) -> Result<Reservation> {
        self.charge(bytes)?;
        Ok(Reservation {
            allocator: self.clone(),
            bytes,
        })
    }

    /// Bytes currently reserved against this budget.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// The byte budget this handle admits against.
    #[must_use]
    pub fn budget(&self) -> usize {
        self.inner.budget
    }

    fn charge(&self, bytes: usize) -> Result<()> {
        let previous = self.inner.in_use.fetch_add(bytes, Ordering::AcqRel);
        if previous.saturating_add(bytes) > self.inner.budget {
            self.inner.in_use.fetch_sub(bytes, Ordering::AcqRel);
            return Err(Error::AllocationFailed {
                requested: bytes,
                budget: self.inner.budget,
                in_use: previous,
            });
        }
        Ok(())
    }

    fn release(&self, bytes: usize) {
        self.inner.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// A scoped charge against one [`BufferAllocator`].
///
/// Held by every structure that pins buffers; dropping the structure
/// releases the charge exactly once.
#[derive(Debug)]
pub struct Reservation {
    allocator: BufferAllocator,
    bytes: usize,
}

impl Reservation {
    /// Charge `bytes` more against the backing budget.
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailed`] when the budget cannot admit
    /// the growth; the reservation keeps what it already holds.
    pub fn grow(&mut self, bytes: usize) -> Result<()> {
        self.allocator.charge(bytes)?;
        self.bytes += bytes;
        Ok(())
    }

    /// Bytes this reservation holds.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.allocator.release(self.bytes);
    }
}
