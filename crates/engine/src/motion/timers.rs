use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Cancellable one-shot timers carrying a payload. Due timers pop in
/// `(due, scheduling order)` order.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    entries: BTreeMap<(Duration, TimerId), T>,
    due_by_id: BTreeMap<TimerId, Duration>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            due_by_id: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((due, id), payload);
        self.due_by_id.insert(id, due);
        id
    }

    /// Removes a pending timer. Already-fired or unknown ids return `None`.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let due = self.due_by_id.remove(&id)?;
        self.entries.remove(&(due, id))
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id)
    }

    pub fn due_of(&self, id: TimerId) -> Option<Duration> {
        self.due_by_id.get(&id).copied()
    }

    /// Next timer due at or before `now`, with its due time.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, TimerId, T)> {
        let (&(due, id), _) = self.entries.first_key_value()?;
        if due > now {
            return None;
        }
        self.due_by_id.remove(&id);
        self.entries
            .remove(&(due, id))
            .map(|payload| (due, id, payload))
    }

    pub fn drain_due(&mut self, now: Duration) -> Vec<(Duration, TimerId, T)> {
        let mut fired = Vec::new();
        while let Some(entry) = self.pop_due(now) {
            fired.push(entry);
        }
        fired
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.due_by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn due_timers_fire_in_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(ms(300), "late");
        timers.schedule(ms(100), "early");
        timers.schedule(ms(100), "early_second");

        assert!(timers.pop_due(ms(50)).is_none());
        let fired = timers
            .drain_due(ms(300))
            .into_iter()
            .map(|(_, _, payload)| payload)
            .collect::<Vec<_>>();
        assert_eq!(fired, vec!["early", "early_second", "late"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(ms(100), 1);
        assert!(timers.is_pending(id));
        assert_eq!(timers.cancel(id), Some(1));
        assert_eq!(timers.due_of(id), None);
        assert_eq!(timers.cancel(id), None);
        assert!(timers.drain_due(ms(1000)).is_empty());
    }

    #[test]
    fn fired_timer_reports_its_due_time() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(ms(2500), ());
        assert_eq!(timers.next_due(), Some(ms(2500)));
        assert_eq!(timers.due_of(id), Some(ms(2500)));
        let (due, fired_id, ()) = timers.pop_due(ms(2516)).expect("due");
        assert_eq!((due, fired_id), (ms(2500), id));
        assert!(!timers.is_pending(id));
        assert_eq!(timers.due_of(id), None);
    }
}
