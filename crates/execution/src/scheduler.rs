//! Capacity budget and admission decisions.

use seqpost_core::Weight;

use crate::running::RunningSet;

/// Budget for one scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Total weight that may run at once
    pub capacity: Weight,
}

impl Default for Budget {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

impl Budget {
    /// Create a new budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total capacity.
    pub fn with_capacity(mut self, capacity: Weight) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Outcome of asking whether the next queued task may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Fits in the remaining capacity
    Admit,
    /// Heavier than the whole capacity; started alone so the run can progress
    AdmitAlone,
    /// Does not fit until something running exits
    Wait,
}

/// Decides admissions against a fixed budget.
///
/// Only the head of the queue is ever considered; a later, lighter task never
/// overtakes a waiting one.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    budget: Budget,
}

impl AdmissionController {
    /// Create a controller for `budget`.
    pub fn new(budget: Budget) -> Self {
        Self { budget }
    }

    /// Decide whether a task of `weight` may start next to `running`.
    pub fn decide(&self, running: &RunningSet, weight: Weight) -> Admission {
        let capacity = u64::from(self.budget.capacity);

        if running.weight() + u64::from(weight) <= capacity {
            Admission::Admit
        } else if running.is_empty() {
            Admission::AdmitAlone
        } else {
            Admission::Wait
        }
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(Budget::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqpost_core::Task;

    fn running_with(weights: &[Weight]) -> RunningSet {
        let mut running = RunningSet::new();
        for (i, w) in weights.iter().enumerate() {
            running.insert(Task::new(format!("task-{i}"), *w), chrono::Utc::now(), None);
        }
        running
    }

    #[test]
    fn test_budget_builder() {
        assert_eq!(Budget::default().capacity, 20);
        assert_eq!(Budget::new().with_capacity(4).capacity, 4);
    }

    #[test]
    fn test_admits_while_capacity_remains() {
        let controller = AdmissionController::new(Budget::new().with_capacity(5));

        assert_eq!(controller.decide(&running_with(&[]), 5), Admission::Admit);
        assert_eq!(controller.decide(&running_with(&[2]), 3), Admission::Admit);
        assert_eq!(controller.decide(&running_with(&[1, 1, 1]), 2), Admission::Admit);
    }

    #[test]
    fn test_waits_when_next_does_not_fit() {
        let controller = AdmissionController::new(Budget::new().with_capacity(5));

        assert_eq!(controller.decide(&running_with(&[5]), 1), Admission::Wait);
        assert_eq!(controller.decide(&running_with(&[2, 2]), 2), Admission::Wait);
    }

    #[test]
    fn test_oversized_task_admitted_only_when_idle() {
        let controller = AdmissionController::new(Budget::new().with_capacity(5));

        assert_eq!(controller.decide(&running_with(&[]), 10), Admission::AdmitAlone);
        assert_eq!(controller.decide(&running_with(&[1]), 10), Admission::Wait);
    }

    #[test]
    fn test_zero_capacity_runs_one_at_a_time() {
        let controller = AdmissionController::new(Budget::new().with_capacity(0));

        assert_eq!(controller.decide(&running_with(&[]), 1), Admission::AdmitAlone);
        assert_eq!(controller.decide(&running_with(&[1]), 1), Admission::Wait);
    }

    #[test]
    fn test_large_weights_do_not_overflow() {
        let controller = AdmissionController::new(Budget::new().with_capacity(Weight::MAX));

        assert_eq!(controller.decide(&running_with(&[Weight::MAX]), Weight::MAX), Admission::Wait);
    }
}
