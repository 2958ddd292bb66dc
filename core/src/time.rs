use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    total_millis: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self { total_millis: 0 }
    }

    pub fn now_millis(&self) -> u64 {
        self.total_millis
    }

    /// 時刻を巻き戻すことはない。
    pub fn advance_to(&mut self, millis: u64) -> u64 {
        self.total_millis = self.total_millis.max(millis);
        self.total_millis
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Due time of a queued callback. Ordering is reversed so a `BinaryHeap`
/// pops the earliest entry first, and FIFO among equal times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTime {
    pub millis: u64,
    pub sequence: u64,
}

impl ScheduledTime {
    pub fn new(millis: u64, sequence: u64) -> Self {
        Self { millis, sequence }
    }
}

impl Ord for ScheduledTime {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .millis
            .cmp(&self.millis)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for ScheduledTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn clock_never_moves_backwards() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance_to(16), 16);
        assert_eq!(clock.advance_to(10), 16);
        assert_eq!(clock.advance_to(40), 40);
        assert_eq!(clock.now_millis(), 40);
    }

    #[test]
    fn heap_pops_earliest_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(ScheduledTime::new(32, 0));
        heap.push(ScheduledTime::new(16, 2));
        heap.push(ScheduledTime::new(16, 1));
        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|time| (time.millis, time.sequence))
            .collect();
        assert_eq!(order, vec![(16, 1), (16, 2), (32, 0)]);
    }
}
