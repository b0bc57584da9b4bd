//! Filtered projection of the task collection for rendering.
//!
//! # Invariants
//! - Projection never mutates its input.
//! - Collection order is preserved within every filter.
//! - Counts always describe the whole collection, not the filtered view.

use crate::model::filter::Filter;
use crate::model::task::Task;

/// Whole-collection counters shown next to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewCounts {
    pub total: usize,
    pub completed: usize,
}

impl ViewCounts {
    /// Number of tasks still open.
    pub fn active(self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

/// One rendered view: visible items plus counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub filter: Filter,
    pub items: Vec<Task>,
    pub counts: ViewCounts,
}

/// Returns a fresh sequence of the tasks visible under `filter`.
pub fn project(tasks: &[Task], filter: Filter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect()
}

/// Counts total and completed tasks.
pub fn counts(tasks: &[Task]) -> ViewCounts {
    ViewCounts {
        total: tasks.len(),
        completed: tasks.iter().filter(|task| task.completed).count(),
    }
}

/// Builds the full projection for one render pass.
pub fn projection(tasks: &[Task], filter: Filter) -> Projection {
    Projection {
        filter,
        items: project(tasks, filter),
        counts: counts(tasks),
    }
}

#[cfg(test)]
mod tests {
    use super::{counts, project, projection, ViewCounts};
    use crate::model::filter::Filter;
    use crate::model::task::{Task, TaskId};

    fn task(id: u64, completed: bool) -> Task {
        let mut task = Task::new(
            TaskId::new(id).expect("fixture ids are positive"),
            format!("task {id}"),
            "2026-10-18T09:00:00.000Z",
        );
        task.completed = completed;
        task
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|task| task.id.get()).collect()
    }

    #[test]
    fn filters_preserve_collection_order() {
        let tasks = vec![task(5, false), task(4, true), task(3, false), task(2, true)];

        assert_eq!(ids(&project(&tasks, Filter::All)), vec![5, 4, 3, 2]);
        assert_eq!(ids(&project(&tasks, Filter::Active)), vec![5, 3]);
        assert_eq!(ids(&project(&tasks, Filter::Completed)), vec![4, 2]);
    }

    #[test]
    fn counts_ignore_filter() {
        let tasks = vec![task(2, true), task(1, false)];
        let view = projection(&tasks, Filter::Completed);

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.counts, counts(&tasks));
        assert_eq!(view.counts.total, 2);
        assert_eq!(view.counts.completed, 1);
        assert_eq!(view.counts.active(), 1);
    }

    #[test]
    fn empty_collection_projects_empty() {
        assert!(project(&[], Filter::Active).is_empty());
        assert_eq!(counts(&[]).total, 0);
    }

    #[test]
    fn active_count_never_underflows() {
        let inconsistent = ViewCounts {
            total: 0,
            completed: 1,
        };
        assert_eq!(inconsistent.active(), 0);
    }
}
