//! Concurrent DAG task scheduler for the generation pipeline.
//!
//! This crate provides the [`TaskGraph`], a dependency-graph executor running
//! tasks on a bounded worker pool. Tasks can be registered before or after
//! execution has started, callers can block on the transitive dependency
//! closure of a subset ([`TaskGraph::run_and_wait`]) while unrelated work
//! keeps running, and task failures are isolated and collected instead of
//! aborting sibling work.
//!
//! The scheduler knows nothing about types, caches, or pipelines; its unit of
//! work is an opaque one-shot closure.

#![warn(missing_docs)]

pub mod graph;
pub mod task;

pub use graph::TaskGraph;
pub use task::{Priority, Task, TaskError, TaskFailure, TaskId, TaskResult};
