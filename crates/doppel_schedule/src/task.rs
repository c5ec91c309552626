//! Schedulable units of work and their identities.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The result type returned by task work closures.
pub type TaskResult = Result<(), TaskError>;

type Job = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// A process-wide unique identity for a [`Task`].
///
/// Identities are assigned at task construction and never reused, which is
/// what lets the graph delete completed nodes immediately: a dependency on an
/// unknown id either belongs to a task that already ran (its
/// [`has_started`](Task::has_started) flag is set) or to one that was never
/// registered.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaskId(u64);

/// The priority class of a task.
///
/// `Child` tasks are dynamically discovered work registered mid-run (for
/// example per-file subtasks spawned once a stage knows its file count) and
/// are dequeued ahead of `Default` tasks so in-flight stages finish before
/// new top-level work begins.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Priority {
    /// Top-level pipeline work.
    Default,
    /// Dynamically discovered subtask work, scheduled ahead of `Default`.
    Child,
}

/// An error returned (or a panic captured) by a task's work closure.
///
/// Task errors never abort the run; they are recorded by the graph and
/// surfaced to the orchestrator after the waited-for work completes.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    /// Description of the failure.
    pub message: String,
}

impl TaskError {
    /// Creates a new task error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// A failed task recorded by the graph: the task's label plus its error.
#[derive(Debug)]
pub struct TaskFailure {
    /// The label of the task that failed.
    pub label: String,
    /// The error the task produced (or the captured panic message).
    pub error: TaskError,
}

/// One schedulable unit of work.
///
/// A task owns a one-shot work closure, a human-readable label used in
/// failure reports, and a [`Priority`]. Tasks are shared as `Arc<Task>`: the
/// graph keeps a clone of every registered task alive for the duration of the
/// run, and callers keep clones of the tasks they want to express
/// dependencies on or wait for.
pub struct Task {
    id: TaskId,
    label: String,
    priority: Priority,
    job: Mutex<Option<Job>>,
    started: AtomicBool,
}

impl Task {
    /// Creates a default-priority task.
    pub fn new(
        label: impl Into<String>,
        job: impl FnOnce() -> TaskResult + Send + 'static,
    ) -> Arc<Self> {
        Self::with_priority(label, Priority::Default, job)
    }

    /// Creates a child-priority task for dynamically discovered work.
    pub fn child(
        label: impl Into<String>,
        job: impl FnOnce() -> TaskResult + Send + 'static,
    ) -> Arc<Self> {
        Self::with_priority(label, Priority::Child, job)
    }

    /// Creates a task with an explicit priority class.
    pub fn with_priority(
        label: impl Into<String>,
        priority: Priority,
        job: impl FnOnce() -> TaskResult + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            priority,
            job: Mutex::new(Some(Box::new(job))),
            started: AtomicBool::new(false),
        })
    }

    /// Returns this task's unique identity.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns this task's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns this task's priority class.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns `true` once the task's work closure has been taken for
    /// execution. Combined with absence from the live graph this identifies
    /// a completed task.
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Takes the work closure, marking the task as started. Returns `None`
    /// if the closure was already taken.
    pub(crate) fn take_job(&self) -> Option<Job> {
        let job = self.job.lock().unwrap().take();
        if job.is_some() {
            self.started.store(true, Ordering::Release);
        }
        job
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("priority", &self.priority)
            .field("started", &self.has_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Task::new("a", || Ok(()));
        let b = Task::new("b", || Ok(()));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn take_job_is_one_shot() {
        let task = Task::new("once", || Ok(()));
        assert!(!task.has_started());
        let job = task.take_job();
        assert!(job.is_some());
        assert!(task.has_started());
        assert!(task.take_job().is_none());
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Child > Priority::Default);
    }

    #[test]
    fn child_constructor_sets_priority() {
        let task = Task::child("c", || Ok(()));
        assert_eq!(task.priority(), Priority::Child);
        let task = Task::new("d", || Ok(()));
        assert_eq!(task.priority(), Priority::Default);
    }

    #[test]
    fn error_from_conversions() {
        let from_str: TaskError = "boom".into();
        assert_eq!(from_str.message, "boom");
        let from_string: TaskError = String::from("bang").into();
        assert_eq!(format!("{from_string}"), "bang");
    }
}
