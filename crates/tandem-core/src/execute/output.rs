//! Result slots and run output.

use std::time::Duration;

/// Outcome for one input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<U, E> {
    /// No outcome recorded: the item was never claimed, or its operation
    /// settled after the run was aborted.
    NotAttempted,
    /// The operation failed.
    Failed(E),
    /// The operation succeeded.
    Completed(U),
}

impl<U, E> Slot<U, E> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Whether an outcome was recorded for the item.
    pub fn is_attempted(&self) -> bool {
        !matches!(self, Self::NotAttempted)
    }

    /// The success value, if any.
    pub fn value(&self) -> Option<&U> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<U> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Counters collected while a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Items whose operation was started.
    pub claimed: usize,
    /// Operations that succeeded.
    pub completed: usize,
    /// Operations that failed.
    pub failed: usize,
    /// Operations that settled after an abort. Their outcome is dropped.
    pub discarded: usize,
    /// Highest number of operations observed in flight at once.
    pub peak_concurrency: usize,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

/// Ordered results of a run: slot `i` belongs to input item `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput<U, E> {
    slots: Vec<Slot<U, E>>,
    stats: RunStats,
}

impl<U, E> RunOutput<U, E> {
    pub(crate) fn new(slots: Vec<Slot<U, E>>, stats: RunStats) -> Self {
        Self { slots, stats }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot<U, E>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Slot<U, E>> {
        self.slots
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn completed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_failed()).count()
    }

    /// Whether every item succeeded.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_completed)
    }

    /// Success values by position; `None` for failed or unattempted items.
    pub fn values(&self) -> Vec<Option<&U>> {
        self.slots.iter().map(Slot::value).collect()
    }

    pub fn into_values(self) -> Vec<Option<U>> {
        self.slots.into_iter().map(Slot::into_value).collect()
    }

    /// Failures with their item index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &E)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.error().map(|e| (index, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunOutput<u32, String> {
        RunOutput::new(
            vec![
                Slot::Completed(2),
                Slot::Failed("bad input".to_string()),
                Slot::NotAttempted,
                Slot::Completed(8),
            ],
            RunStats::default(),
        )
    }

    #[test]
    fn test_three_state_slots() {
        let output = sample();
        let slots = output.slots();

        assert!(slots[0].is_completed());
        assert!(slots[1].is_failed());
        assert!(slots[1].is_attempted());
        assert!(!slots[2].is_attempted());
    }

    #[test]
    fn test_counts() {
        let output = sample();
        assert_eq!(output.len(), 4);
        assert_eq!(output.completed_count(), 2);
        assert_eq!(output.failed_count(), 1);
        assert!(!output.is_complete());
    }

    #[test]
    fn test_values_keep_positions() {
        let output = sample();
        assert_eq!(output.values(), vec![Some(&2), None, None, Some(&8)]);
        assert_eq!(output.into_values(), vec![Some(2), None, None, Some(8)]);
    }

    #[test]
    fn test_failures_report_index() {
        let output = sample();
        let failures: Vec<_> = output.failures().collect();
        assert_eq!(failures, vec![(1, &"bad input".to_string())]);
    }

    #[test]
    fn test_empty_output_is_complete() {
        let output: RunOutput<(), String> = RunOutput::new(Vec::new(), RunStats::default());
        assert!(output.is_empty());
        assert!(output.is_complete());
    }
}
