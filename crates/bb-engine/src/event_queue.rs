//! Lock-free single-producer/single-consumer event queue.
//!
//! The audio context is the only producer and the host context the only
//! consumer. Items travel as packed `u32` words so every slot is a plain
//! atomic. Each slot also carries a stamp: zero means empty, anything else
//! was written by `enqueue` and published with release ordering.

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::error::{CaslError, Result};

/// Ring size. Power of two so wraparound is a mask.
pub const EVENT_QUEUE_SIZE: usize = 64;
const MASK: usize = EVENT_QUEUE_SIZE - 1;

/// Something that fits in one queue slot.
pub trait QueueItem: Copy {
    fn pack(self) -> u32;
    fn unpack(word: u32) -> Option<Self>;
}

/// Notifications crossing from the audio context to the host context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The instance's root sequence ran out of stages.
    AslDone(u8),
    /// The instance halted on an evaluation error.
    AslFault(u8),
}

const TAG_DONE: u32 = 1;
const TAG_FAULT: u32 = 2;

impl QueueItem for Event {
    fn pack(self) -> u32 {
        match self {
            Event::AslDone(ch) => (TAG_DONE << 8) | ch as u32,
            Event::AslFault(ch) => (TAG_FAULT << 8) | ch as u32,
        }
    }

    fn unpack(word: u32) -> Option<Self> {
        let ch = word as u8;
        match word >> 8 {
            TAG_DONE => Some(Event::AslDone(ch)),
            TAG_FAULT => Some(Event::AslFault(ch)),
            _ => None,
        }
    }
}

/// Destination for events produced by the interpreter.
pub trait EventSink {
    /// Best-effort delivery; `QueueFull` means the event was dropped.
    fn publish(&self, event: Event) -> Result<()>;
}

/// Fixed-capacity SPSC ring. Holds at most `EVENT_QUEUE_SIZE - 1` items.
pub struct EventQueue<T: QueueItem = Event> {
    head: AtomicUsize,
    tail: AtomicUsize,
    stamp: AtomicU32,
    sequence: [AtomicU32; EVENT_QUEUE_SIZE],
    data: [AtomicU32; EVENT_QUEUE_SIZE],
    _item: PhantomData<T>,
}

impl<T: QueueItem> EventQueue<T> {
    pub const fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            stamp: AtomicU32::new(0),
            sequence: [const { AtomicU32::new(0) }; EVENT_QUEUE_SIZE],
            data: [const { AtomicU32::new(0) }; EVENT_QUEUE_SIZE],
            _item: PhantomData,
        }
    }

    /// Producer side. Never blocks; fails with `QueueFull` instead.
    pub fn enqueue(&self, item: T) -> Result<()> {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & MASK;
        if next == self.tail.load(Ordering::Acquire) {
            return Err(CaslError::QueueFull);
        }

        // zero marks an empty slot, so skip it on wrap
        let mut stamp = self.stamp.load(Ordering::Relaxed).wrapping_add(1);
        if stamp == 0 {
            stamp = 1;
        }
        self.stamp.store(stamp, Ordering::Relaxed);

        self.data[head].store(item.pack(), Ordering::Relaxed);
        self.sequence[head].store(stamp, Ordering::Release);
        self.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Consumer side. `None` when empty or the slot holds no valid data.
    pub fn dequeue(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        if self.sequence[tail].load(Ordering::Acquire) == 0 {
            return None;
        }

        let word = self.data[tail].load(Ordering::Relaxed);
        self.data[tail].store(0, Ordering::Relaxed);
        self.sequence[tail].store(0, Ordering::Release);
        self.tail.store((tail + 1) & MASK, Ordering::Release);

        let item = T::unpack(word);
        if item.is_none() {
            tracing::warn!(word, "discarding unrecognized queue word");
        }
        item
    }

    /// Advisory item count.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & MASK
    }

    /// Advisory.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Advisory.
    pub fn is_full(&self) -> bool {
        let next = (self.head.load(Ordering::Acquire) + 1) & MASK;
        next == self.tail.load(Ordering::Acquire)
    }

    pub const fn capacity(&self) -> usize {
        EVENT_QUEUE_SIZE - 1
    }
}

impl<T: QueueItem> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventQueue<Event> {
    fn publish(&self, event: Event) -> Result<()> {
        self.enqueue(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_pack_round_trip() {
        for ev in [Event::AslDone(0), Event::AslDone(3), Event::AslFault(2)] {
            assert_eq!(Event::unpack(ev.pack()), Some(ev));
        }
        assert_eq!(Event::unpack(0), None);
    }

    #[test]
    fn dequeue_empty_fails() {
        let q: EventQueue = EventQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn fifo_order() {
        let q: EventQueue = EventQueue::new();
        q.enqueue(Event::AslDone(0)).unwrap();
        q.enqueue(Event::AslDone(1)).unwrap();
        q.enqueue(Event::AslFault(2)).unwrap();
        assert_eq!(q.len(), 3);

        assert_eq!(q.dequeue(), Some(Event::AslDone(0)));
        assert_eq!(q.dequeue(), Some(Event::AslDone(1)));
        assert_eq!(q.dequeue(), Some(Event::AslFault(2)));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn full_queue_rejects_without_corruption() {
        let q: EventQueue = EventQueue::new();
        let mut accepted = 0;
        while q.enqueue(Event::AslDone((accepted % 4) as u8)).is_ok() {
            accepted += 1;
        }
        assert_eq!(accepted, q.capacity());
        assert!(q.is_full());
        assert_eq!(q.enqueue(Event::AslFault(0)), Err(CaslError::QueueFull));

        for i in 0..accepted {
            assert_eq!(q.dequeue(), Some(Event::AslDone((i % 4) as u8)));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn wraps_around() {
        let q: EventQueue = EventQueue::new();
        for round in 0..3 * EVENT_QUEUE_SIZE {
            q.enqueue(Event::AslDone((round % 4) as u8)).unwrap();
            assert_eq!(q.dequeue(), Some(Event::AslDone((round % 4) as u8)));
        }
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn len_counts_across_wrap() {
        let q: EventQueue = EventQueue::new();
        for _ in 0..EVENT_QUEUE_SIZE - 2 {
            q.enqueue(Event::AslDone(0)).unwrap();
            q.dequeue();
        }
        for _ in 0..5 {
            q.enqueue(Event::AslDone(1)).unwrap();
        }
        assert_eq!(q.len(), 5);
    }

    #[test]
    fn publish_goes_through_queue() {
        let q: EventQueue = EventQueue::new();
        q.publish(Event::AslDone(2)).unwrap();
        assert_eq!(q.dequeue(), Some(Event::AslDone(2)));
    }
}
