//! Cooperative task queue
//!
//! Work that must happen after the current step (script initialization,
//! nested instance setup, refreshes) is posted here and drained in FIFO
//! order. Every task remembers the render generation it belongs to, so
//! tasks left over from a superseded render are dropped instead of run.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Create and bind the root context
    InitRoot,

    /// Run one instance's init hook
    RunInit { instance_id: String },

    /// Find and initialize nested instances not yet registered
    InitNested,

    /// Re-apply bindings of instances marked as changed
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub generation: u64,
    pub kind: TaskKind,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    generation: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation, dropping everything queued under older ones
    pub fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.tasks.clear();
        self.generation
    }

    /// Queue a task under the current generation
    pub fn post(&mut self, kind: TaskKind) {
        if kind == TaskKind::Refresh && self.tasks.iter().any(|t| t.kind == TaskKind::Refresh) {
            return;
        }
        self.tasks.push_back(Task {
            generation: self.generation,
            kind,
        });
    }

    /// Next task of the current generation
    pub fn next(&mut self) -> Option<Task> {
        while let Some(task) = self.tasks.pop_front() {
            if task.generation == self.generation {
                return Some(task);
            }
            tracing::trace!(generation = task.generation, kind = ?task.kind, "dropping stale task");
        }
        None
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = TaskQueue::new();
        queue.post(TaskKind::InitRoot);
        queue.post(TaskKind::InitNested);
        queue.post(TaskKind::RunInit {
            instance_id: "a".into(),
        });

        assert_eq!(queue.next().map(|t| t.kind), Some(TaskKind::InitRoot));
        assert_eq!(queue.next().map(|t| t.kind), Some(TaskKind::InitNested));
        assert!(matches!(
            queue.next().map(|t| t.kind),
            Some(TaskKind::RunInit { .. })
        ));
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn test_stale_tasks_skipped() {
        let mut queue = TaskQueue::new();
        queue.post(TaskKind::InitRoot);
        let stale = Task {
            generation: queue.generation(),
            kind: TaskKind::InitNested,
        };

        let generation = queue.advance();
        assert!(queue.is_empty());

        // A task that slipped in under an old generation is dropped
        queue.tasks.push_back(stale);
        queue.post(TaskKind::Refresh);
        let task = queue.next().unwrap();
        assert_eq!(task.kind, TaskKind::Refresh);
        assert_eq!(task.generation, generation);
    }

    #[test]
    fn test_refresh_coalesced() {
        let mut queue = TaskQueue::new();
        queue.post(TaskKind::Refresh);
        queue.post(TaskKind::Refresh);
        assert_eq!(queue.len(), 1);
    }
}
