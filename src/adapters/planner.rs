//! Motion planner queue.
//!
//! A bounded FIFO of straight-line segments between the parser and the
//! stepper.  No acceleration profile is computed; segments are executed
//! at their programmed rate.

use heapless::Deque;

use crate::system::{AxisVector, N_AXIS};

/// Segments the queue can hold.
pub const PLANNER_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub target: AxisVector,
    /// mm/min; ignored for rapids.
    pub feed_rate: f32,
    pub rapid: bool,
}

#[derive(Debug)]
pub struct Planner {
    queue: Deque<Segment, PLANNER_CAPACITY>,
    /// Target of the last queued segment.
    position: AxisVector,
}

impl Planner {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
            position: [0.0; N_AXIS],
        }
    }

    /// Queue a segment.  Gives it back when the queue is full.
    pub fn push(&mut self, segment: Segment) -> Result<(), Segment> {
        self.queue.push_back(segment)?;
        self.position = segment.target;
        Ok(())
    }

    /// Take the oldest segment for execution.
    pub fn pop(&mut self) -> Option<Segment> {
        self.queue.pop_front()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn position(&self) -> &AxisVector {
        &self.position
    }

    /// Drop every queued segment.  The position cache is invalid until
    /// the next [`sync_position`](Self::sync_position).
    pub fn reset(&mut self) {
        self.queue.clear();
        self.position = [0.0; N_AXIS];
    }

    pub fn sync_position(&mut self, position: &AxisVector) {
        self.position = *position;
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
