use std::collections::VecDeque;

use super::event::FlightEvent;

// ---------------------------------------------------------------------------
// Time-ordered event queue
// ---------------------------------------------------------------------------

/// A queue of flight events kept in total order: ascending time, ties broken
/// by the fixed kind rank.  Events with identical keys keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<FlightEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: VecDeque::new() }
    }

    /// Insert an event, preserving the total order.
    pub fn push(&mut self, event: FlightEvent) {
        let key = (event.time, event.kind.rank());
        let idx = self.events.partition_point(|e| {
            match e.time.total_cmp(&event.time) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal => e.kind.rank() <= key.1,
                std::cmp::Ordering::Greater => false,
            }
        });
        self.events.insert(idx, event);
    }

    /// The earliest pending event, without removing it.
    pub fn peek(&self) -> Option<&FlightEvent> {
        self.events.front()
    }

    /// Remove and return the earliest pending event.
    pub fn pop(&mut self) -> Option<FlightEvent> {
        self.events.pop_front()
    }

    /// Remove the head only if it is due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<FlightEvent> {
        if self.peek().is_some_and(|e| e.time <= now) {
            self.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlightEvent> {
        self.events.iter()
    }
}
