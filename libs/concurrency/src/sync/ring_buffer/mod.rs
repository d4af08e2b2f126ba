//! Bounded multi-producer multi-consumer FIFO on a fixed array of slots.
//!
//! Each slot carries a sequence number which tells whose turn it is:
//! for position `pos` (a monotonically growing counter mapped onto slot
//! `pos % slots`) the slot is writable when `seq == pos` and readable when
//! `seq == pos + 1`. Producers and consumers claim positions by CAS on `tail`
//! and `head` respectively, so no lock is needed and every stored item is
//! handed to exactly one consumer.
//!
//! At least 2 slots are allocated, even for capacity 1: with a single slot the
//! sequence number of a filled slot (`pos + 1`) would read as "writable" for
//! the next position. The capacity is enforced against `tail - head` instead.
//!
//! The buffer never grows. `offer` on a full buffer hands the item back,
//! leaving the retry policy to the caller. `dispose` releases all pending
//! items and makes every later call fail with [`Disposed`].
use crate::ctx;
use std::{
    cell::UnsafeCell,
    fmt,
    mem::MaybeUninit,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::{futures::Notified, Notify};

#[cfg(test)]
mod tests;

/// Ring buffer has been disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("ring buffer disposed")]
pub struct Disposed;

/// Error of [`RingBuffer::recv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// Buffer has been disposed while waiting.
    #[error(transparent)]
    Disposed(#[from] Disposed),
    /// Context has been canceled while waiting.
    #[error(transparent)]
    Canceled(#[from] ctx::Canceled),
}

/// Outcome of [`RingBuffer::offer`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub enum Offer<T> {
    /// Item has been stored.
    Accepted,
    /// No free slot; the item is handed back.
    Full(T),
}

struct Slot<T> {
    seq: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Fixed capacity concurrent FIFO.
pub struct RingBuffer<T> {
    slots: Box<[Slot<T>]>,
    capacity: u64,
    head: AtomicU64,
    tail: AtomicU64,
    disposed: AtomicBool,
    /// Notified after every successful `offer` and on `dispose`.
    readable: Notify,
    /// Notified after every successful poll and on `dispose`.
    writable: Notify,
}

// SAFETY: a slot's value is accessed only by the single producer or consumer
// which won the CAS for its position, and publication goes through the
// release/acquire pair on `seq`.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T> RingBuffer<T> {
    /// Empty buffer holding at most `capacity` items.
    ///
    /// # Panics
    /// If `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            slots: (0..capacity.max(2) as u64)
                .map(|i| Slot {
                    seq: AtomicU64::new(i),
                    value: UnsafeCell::new(MaybeUninit::uninit()),
                })
                .collect(),
            capacity: capacity as u64,
            head: AtomicU64::new(0),
            tail: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Maximal number of stored items.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn slots_len(&self) -> u64 {
        self.slots.len() as u64
    }

    fn slot(&self, pos: u64) -> &Slot<T> {
        &self.slots[(pos % self.slots_len()) as usize]
    }

    /// Number of stored items. Advisory under concurrent access.
    pub fn len(&self) -> u64 {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.saturating_sub(head).min(self.capacity())
    }

    /// Whether `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), Disposed> {
        if self.is_disposed() {
            return Err(Disposed);
        }
        Ok(())
    }

    /// Stores `item` at the back, unless the buffer is full. Never blocks.
    pub fn offer(&self, item: T) -> Result<Offer<T>, Disposed> {
        self.check()?;
        let mut pos = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            let seq = slot.seq.load(Ordering::Acquire);
            match seq.cmp(&pos) {
                std::cmp::Ordering::Equal => {
                    if pos.saturating_sub(self.head.load(Ordering::Acquire)) >= self.capacity {
                        return Ok(Offer::Full(item));
                    }
                    if let Err(cur) = self.tail.compare_exchange_weak(
                        pos,
                        pos + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        pos = cur;
                        continue;
                    }
                    // SAFETY: the CAS above made this thread the only writer of the slot
                    // until `seq` is bumped.
                    unsafe { (*slot.value.get()).write(item) };
                    slot.seq.store(pos + 1, Ordering::Release);
                    self.readable.notify_waiters();
                    return Ok(Offer::Accepted);
                }
                // The slot still holds the item from the previous lap.
                std::cmp::Ordering::Less => return Ok(Offer::Full(item)),
                // Another producer took `pos` already.
                std::cmp::Ordering::Greater => pos = self.tail.load(Ordering::Relaxed),
            }
        }
    }

    /// Takes the front item, regardless of disposal.
    fn take(&self) -> Option<T> {
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            let seq = slot.seq.load(Ordering::Acquire);
            match seq.cmp(&(pos + 1)) {
                std::cmp::Ordering::Equal => {
                    if let Err(cur) = self.head.compare_exchange_weak(
                        pos,
                        pos + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        pos = cur;
                        continue;
                    }
                    // SAFETY: `seq == pos + 1` means the value was fully written,
                    // and the CAS made this thread its only reader.
                    let item = unsafe { (*slot.value.get()).assume_init_read() };
                    slot.seq.store(pos + self.slots_len(), Ordering::Release);
                    self.writable.notify_waiters();
                    return Some(item);
                }
                // Nothing written at `pos` yet.
                std::cmp::Ordering::Less => return None,
                // Another consumer took `pos` already.
                std::cmp::Ordering::Greater => pos = self.head.load(Ordering::Relaxed),
            }
        }
    }

    /// Takes the front item if there is one. Never blocks.
    pub fn poll(&self) -> Result<Option<T>, Disposed> {
        self.check()?;
        Ok(self.take())
    }

    /// Awaits the front item.
    pub async fn recv(&self, ctx: &ctx::Ctx) -> Result<T, RecvError> {
        loop {
            let readable = self.readable();
            tokio::pin!(readable);
            readable.as_mut().enable();
            if let Some(item) = self.poll()? {
                return Ok(item);
            }
            ctx.wait(readable).await?;
        }
    }

    /// Future completing on the next successful `offer` or on `dispose`.
    /// Enable it (`Notified::enable`) before checking the buffer to avoid
    /// missing a wakeup.
    pub fn readable(&self) -> Notified<'_> {
        self.readable.notified()
    }

    /// Future completing on the next successful poll or on `dispose`.
    /// Same usage as [`Self::readable`].
    pub fn writable(&self) -> Notified<'_> {
        self.writable.notified()
    }

    /// Drops all pending items and fails every later operation.
    /// Wakes all tasks waiting on `readable`/`writable`. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        while self.take().is_some() {}
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.take().is_some() {}
    }
}
