//! Discrete-event scheduler driving the simulated timeline.
//!
//! Events run one at a time in non-decreasing time order. Events registered for
//! the same instant run in registration order. Nothing is ever cancelled; a stop
//! time simply leaves later events unexecuted.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::SimTime;

#[cfg(test)]
mod tests;

/// Registration number of a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// How a call to [`Scheduler::run`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No events were left
    Drained,
    /// The stop time was reached with `pending` events still queued
    Stopped { pending: usize },
}

struct ScheduledEvent<E> {
    time: SimTime,
    id: EventId,
    event: E,
}

impl<E> PartialEq for ScheduledEvent<E> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl<E> Eq for ScheduledEvent<E> {}

impl<E> PartialOrd for ScheduledEvent<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for ScheduledEvent<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap: earliest time first, then earliest registration
        other.time.cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

pub struct Scheduler<E> {
    now: SimTime,
    next_id: u64,
    queue: BinaryHeap<ScheduledEvent<E>>,
    stop_at: Option<SimTime>,
    executed: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_id: 0,
            queue: BinaryHeap::new(),
            stop_at: None,
            executed: 0,
        }
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Registers `event` to run at `at`. A time already in the past runs at the current time.
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> EventId {
        let time = if at < self.now {
            tracing::warn!("Event scheduled in the past ({} < {}), running it now", at, self.now);
            self.now
        } else {
            at
        };
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.queue.push(ScheduledEvent { time, id, event });
        id
    }

    /// Registers `event` to run `delay` after the current time
    pub fn schedule_in(&mut self, delay: SimTime, event: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule_at(at, event)
    }

    /// Events after `at` will not run. Events at exactly `at` still do.
    pub fn stop(&mut self, at: SimTime) {
        self.stop_at = Some(at);
    }

    pub fn stop_time(&self) -> Option<SimTime> {
        self.stop_at
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of events executed so far
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Runs events until the queue drains or the stop time passes.
    ///
    /// The handler may schedule further events. The first handler error stops the
    /// run and is returned; the clock stays at the failing event's time.
    pub fn run<F, Err>(&mut self, mut handler: F) -> Result<RunOutcome, Err>
    where
        F: FnMut(&mut Scheduler<E>, E) -> Result<(), Err>,
    {
        loop {
            let next_time = match self.queue.peek() {
                Some(next) => next.time,
                None => return Ok(RunOutcome::Drained),
            };
            if let Some(stop_at) = self.stop_at {
                if next_time > stop_at {
                    self.now = stop_at;
                    return Ok(RunOutcome::Stopped { pending: self.queue.len() });
                }
            }
            let Some(next) = self.queue.pop() else {
                return Ok(RunOutcome::Drained);
            };
            self.now = next.time;
            self.executed += 1;
            handler(self, next.event)?;
        }
    }
}
