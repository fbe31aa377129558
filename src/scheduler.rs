//! Deferred and periodic work on a virtual clock.
//!
//! Nothing here sleeps. The owner advances time explicitly and pops due tasks one at a time, so a
//! task that cancels others (round over, restart) takes effect before the next one is handed out.
//! Every entry carries the generation it was scheduled in; `cancel_all` bumps the generation and
//! leftovers from an earlier generation are dropped instead of run.

use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry<T> {
    /// Scheduling order; breaks ties between tasks due at the same instant.
    seq: u64,
    due: Duration,
    period: Option<Duration>,
    generation: u64,
    task: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    generation: u64,
    next_seq: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            generation: 0,
            next_seq: 0,
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` once, `delay` from now. Delays past the end of the clock never come due.
    pub fn once(&mut self, delay: Duration, task: T) {
        self.push(self.now.saturating_add(delay), None, task);
    }

    /// Run `task` every `period`, first after one full period. A zero period is bumped to 1 ms.
    pub fn every(&mut self, period: Duration, task: T) {
        let period = period.max(Duration::from_millis(1));
        self.push(self.now.saturating_add(period), Some(period), task);
    }

    fn push(&mut self, due: Duration, period: Option<Duration>, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            seq,
            due,
            period,
            generation: self.generation,
            task,
        });
    }

    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) {
        self.entries.retain(|e| !pred(&e.task));
    }

    /// Invalidate everything scheduled so far.
    pub fn cancel_all(&mut self) {
        self.generation += 1;
    }

    /// Time until the first live task matching `pred` is due.
    pub fn time_until(&self, mut pred: impl FnMut(&T) -> bool) -> Option<Duration> {
        self.entries
            .iter()
            .filter(|e| e.generation == self.generation && pred(&e.task))
            .map(|e| e.due.saturating_sub(self.now))
            .min()
    }

    /// Hand out the earliest task due at or before `until`, moving the clock to its due time.
    /// Ties go to whichever was scheduled first.
    pub fn pop_due(&mut self, until: Duration) -> Option<T> {
        let generation = self.generation;
        self.entries.retain(|e| e.generation == generation);

        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= until)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(pos, _)| pos)?;

        let due = self.entries[pos].due;
        self.now = self.now.max(due);
        match self.entries[pos].period {
            Some(period) => {
                let entry = &mut self.entries[pos];
                entry.due = entry.due.saturating_add(period);
                Some(entry.task.clone())
            }
            None => Some(self.entries.swap_remove(pos).task),
        }
    }

    /// Move the clock forward without running anything.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
