use std::collections::VecDeque;

use crate::{synth::message::TimedEvent, DEFAULT_GRANULARITY, MAX_BLOCK_SIZE};

// Quantization: with granularity 16 an event at offset 20 is stored at 16,
// so everything inside one sub-block is applied together at its start.
//
//   offset    0    16   32   48
//             |----|----|----|
//   event           ^20
//   stored         ^16
//
// After each block the remaining offsets drop by the block length, keeping
// them relative to the start of the next block.

/// Pending events for the current block, in arrival order.
///
/// Offsets are snapped down to the granularity grid on the way in, so every
/// event that lands inside one sub-block is handled at its start. The host
/// delivers events in time order; the queue never sorts.
pub struct EventQueue {
    events: VecDeque<TimedEvent>,
    granularity: usize,
}

impl EventQueue {
    pub fn new(granularity: usize) -> Self {
        Self::with_capacity(granularity, MAX_BLOCK_SIZE)
    }

    pub fn with_capacity(granularity: usize, capacity: usize) -> Self {
        debug_assert!(granularity > 0, "granularity must be at least one frame");
        Self {
            events: VecDeque::with_capacity(capacity),
            granularity: granularity.max(1),
        }
    }

    pub fn granularity(&self) -> usize {
        self.granularity
    }

    /// Change the quantisation grid. Events already queued keep their offset.
    pub fn set_granularity(&mut self, granularity: usize) {
        debug_assert!(granularity > 0, "granularity must be at least one frame");
        self.granularity = granularity.max(1);
    }

    /// Make room for at least `frames` events without reallocating.
    pub fn reserve(&mut self, frames: usize) {
        self.events.reserve(frames.saturating_sub(self.events.len()));
    }

    pub fn enqueue(&mut self, mut event: TimedEvent) {
        if self.granularity > 1 {
            event.offset = (event.offset / self.granularity) * self.granularity;
        }
        self.events.push_back(event);
    }

    pub fn peek(&self) -> Option<&TimedEvent> {
        self.events.front()
    }

    pub fn pop(&mut self) -> Option<TimedEvent> {
        self.events.pop_front()
    }

    /// Pop the head if it starts before `end` (exclusive).
    pub fn pop_before(&mut self, end: usize) -> Option<TimedEvent> {
        match self.events.front() {
            Some(event) if event.offset < end => self.events.pop_front(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Re-base the remaining offsets after `frames` frames were consumed.
    ///
    /// Anything that would end up before the new block start is dropped.
    pub fn shift_and_compact(&mut self, frames: usize) {
        self.events.retain_mut(|event| match event.offset.checked_sub(frames) {
            Some(offset) => {
                event.offset = offset;
                true
            }
            None => false,
        });
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_GRANULARITY)
    }
}
