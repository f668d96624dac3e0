use crossbeam_channel::Sender;

use std::cmp::Ordering;
use std::time::Instant;

/// A pending wakeup registered with a [`MockClock`](super::MockClock).
///
/// Entries live in a `BinaryHeap` ordered by deadline. Entries sharing a
/// deadline fire in registration order.
#[derive(Debug)]
pub(crate) struct TimerEntry {
    /// Virtual instant at which the wakeup fires.
    pub(crate) deadline: Instant,

    /// Registration sequence number, used to break deadline ties.
    pub(crate) seq: u64,

    /// Delivers the firing instant to the waiting receiver.
    pub(crate) sender: Sender<Instant>,
}

impl TimerEntry {
    /// Fires the wakeup at `now`.
    ///
    /// A receiver that was already dropped (its `select!` took another arm)
    /// is ignored.
    pub(crate) fn fire(self, now: Instant) {
        let _ = self.sender.try_send(now);
    }
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Reversed so that `BinaryHeap<TimerEntry>` pops the earliest deadline
    /// first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::TimerEntry;

    use crossbeam_channel::bounded;
    use std::collections::BinaryHeap;
    use std::time::{Duration, Instant};

    fn entry(deadline: Instant, seq: u64) -> TimerEntry {
        let (sender, _) = bounded(1);
        TimerEntry {
            deadline,
            seq,
            sender,
        }
    }

    #[test]
    fn test_heap_pops_earliest_first() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();

        heap.push(entry(base + Duration::from_millis(30), 0));
        heap.push(entry(base + Duration::from_millis(10), 1));
        heap.push(entry(base + Duration::from_millis(20), 2));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_equal_deadlines_fire_in_registration_order() {
        let deadline = Instant::now();
        let mut heap = BinaryHeap::new();

        heap.push(entry(deadline, 7));
        heap.push(entry(deadline, 3));
        heap.push(entry(deadline, 5));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![3, 5, 7]);
    }
}
