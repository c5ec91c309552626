//! The live dependency graph and its worker pool.

use crate::task::{Priority, Task, TaskError, TaskFailure, TaskId};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// A concurrent DAG executor.
///
/// Nodes move through registered → ready → running → completed. A completed
/// node is deleted from the live graph the instant its dependents have been
/// notified; the graph keeps no history. Registration is legal before or
/// after [`run`](Self::run): newly-ready nodes registered mid-run are
/// scheduled immediately, and dependencies never seen before are
/// auto-registered as dependency-free nodes.
///
/// Failures (an `Err` return or a panic) are captured at the worker boundary:
/// the node still counts as completed for scheduling purposes, and the
/// failure is recorded for [`take_failures`](Self::take_failures).
pub struct TaskGraph {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    /// Signals workers that the ready queue may be non-empty or shutdown set.
    work_cv: Condvar,
    /// Signals `wait_for_all` callers that the graph may have drained.
    idle_cv: Condvar,
    failures: Mutex<Vec<TaskFailure>>,
}

struct Inner {
    nodes: HashMap<TaskId, NodeState>,
    ready: BinaryHeap<ReadyEntry>,
    running: usize,
    started: bool,
    shutdown: bool,
    seq: u64,
}

struct NodeState {
    task: Arc<Task>,
    /// Remaining (uncompleted) dependencies.
    deps: HashSet<TaskId>,
    dependents: HashSet<TaskId>,
    scheduled: bool,
    waiters: Vec<Arc<WaitGroup>>,
}

impl NodeState {
    fn new(task: Arc<Task>) -> Self {
        Self {
            task,
            deps: HashSet::new(),
            dependents: HashSet::new(),
            scheduled: false,
            waiters: Vec::new(),
        }
    }
}

/// Ready-queue entry ordered by priority class, FIFO within a class.
struct ReadyEntry {
    priority: Priority,
    seq: u64,
    task: Arc<Task>,
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ReadyEntry {}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap: higher priority first, then earliest seq.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Counts down completions of a waited-for closure and wakes the waiter.
struct WaitGroup {
    remaining: Mutex<usize>,
    cv: Condvar,
}

impl WaitGroup {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            cv: Condvar::new(),
        }
    }

    fn done(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining -= 1;
        if *remaining == 0 {
            self.cv.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.cv.wait(remaining).unwrap();
        }
    }
}

impl TaskGraph {
    /// Creates a graph with one worker per available processor.
    pub fn new() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::with_workers(workers)
    }

    /// Creates a graph with a fixed number of worker threads (at least one).
    pub fn with_workers(count: usize) -> Self {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                nodes: HashMap::new(),
                ready: BinaryHeap::new(),
                running: 0,
                started: false,
                shutdown: false,
                seq: 0,
            }),
            work_cv: Condvar::new(),
            idle_cv: Condvar::new(),
            failures: Mutex::new(Vec::new()),
        });
        let workers = (0..count.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(&shared))
            })
            .collect();
        Self { shared, workers }
    }

    /// Registers a task with its dependencies.
    ///
    /// Dependencies never seen by the graph are auto-registered with no
    /// dependencies of their own; dependencies that already ran count as
    /// satisfied. Registering a task a second time never re-queues it:
    /// a live unscheduled node only gains the new edges, and a started task
    /// is left alone entirely. When the graph is running, a task whose
    /// dependency set is empty at registration is scheduled immediately.
    pub fn register(&self, task: &Arc<Task>, dependencies: &[Arc<Task>]) {
        let mut inner = self.shared.inner.lock().unwrap();

        for dep in dependencies {
            if !inner.nodes.contains_key(&dep.id()) && !dep.has_started() {
                inner
                    .nodes
                    .insert(dep.id(), NodeState::new(Arc::clone(dep)));
                if inner.started {
                    self.shared.schedule_locked(&mut inner, dep.id());
                }
            }
        }

        let id = task.id();
        if !inner.nodes.contains_key(&id) {
            if task.has_started() {
                return;
            }
            inner.nodes.insert(id, NodeState::new(Arc::clone(task)));
        }

        // Collect live, unsatisfied dependency edges. Edges are only added
        // while the node is unscheduled; a queued node's dependency set is
        // frozen.
        let node_scheduled = inner.nodes[&id].scheduled;
        if !node_scheduled {
            let live_deps: Vec<TaskId> = dependencies
                .iter()
                .map(|dep| dep.id())
                .filter(|dep_id| *dep_id != id && inner.nodes.contains_key(dep_id))
                .collect();
            if let Some(node) = inner.nodes.get_mut(&id) {
                node.deps.extend(live_deps.iter().copied());
            }
            for dep_id in live_deps {
                if let Some(dep_node) = inner.nodes.get_mut(&dep_id) {
                    dep_node.dependents.insert(id);
                }
            }
        }

        if inner.started {
            self.shared.schedule_locked(&mut inner, id);
        }
    }

    /// Marks the graph as running and schedules every currently-ready node.
    pub fn run(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        inner.started = true;
        let ready: Vec<TaskId> = inner
            .nodes
            .iter()
            .filter(|(_, node)| !node.scheduled && node.deps.is_empty())
            .map(|(id, _)| *id)
            .collect();
        for id in ready {
            self.shared.schedule_locked(&mut inner, id);
        }
    }

    /// Runs the transitive dependency closure of `tasks` and blocks the
    /// calling thread until every node in the closure has completed.
    ///
    /// Closure nodes not yet scheduled are scheduled (without starting the
    /// rest of the graph), independent in-flight work keeps running in the
    /// background, and tasks that already completed — or were never
    /// registered — count as satisfied immediately. Overlapping concurrent
    /// waiters are each notified exactly once per node.
    pub fn run_and_wait(&self, tasks: &[Arc<Task>]) {
        let group = {
            let mut inner = self.shared.inner.lock().unwrap();

            let mut closure: HashSet<TaskId> = HashSet::new();
            let mut stack: Vec<TaskId> = tasks.iter().map(|t| t.id()).collect();
            while let Some(id) = stack.pop() {
                if !closure.insert(id) {
                    continue;
                }
                if let Some(node) = inner.nodes.get(&id) {
                    stack.extend(node.deps.iter().copied());
                }
            }

            let live: Vec<TaskId> = closure
                .into_iter()
                .filter(|id| inner.nodes.contains_key(id))
                .collect();
            if live.is_empty() {
                return;
            }

            let group = Arc::new(WaitGroup::new(live.len()));
            for id in &live {
                if let Some(node) = inner.nodes.get_mut(id) {
                    node.waiters.push(Arc::clone(&group));
                }
            }
            for id in &live {
                self.shared.schedule_locked(&mut inner, *id);
            }
            group
        };
        group.wait();
    }

    /// Blocks until the live graph is empty and no task is running.
    ///
    /// Every registered node must eventually be scheduled for this to
    /// return; it is meant to follow [`run`](Self::run).
    pub fn wait_for_all(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        while !inner.nodes.is_empty() || inner.running > 0 {
            inner = self.shared.idle_cv.wait(inner).unwrap();
        }
    }

    /// Takes all recorded task failures, leaving the list empty.
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        let mut failures = self.shared.failures.lock().unwrap();
        std::mem::take(&mut *failures)
    }

    /// Returns the number of live (not yet completed) nodes.
    pub fn pending(&self) -> usize {
        self.shared.inner.lock().unwrap().nodes.len()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskGraph {
    fn drop(&mut self) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            inner.shutdown = true;
        }
        self.shared.work_cv.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Shared {
    /// Queues a node for execution if it is live, unscheduled, and has no
    /// remaining dependencies. Must be called with the graph lock held.
    fn schedule_locked(&self, inner: &mut Inner, id: TaskId) {
        let (priority, task) = match inner.nodes.get_mut(&id) {
            Some(node) if !node.scheduled && node.deps.is_empty() => {
                node.scheduled = true;
                (node.task.priority(), Arc::clone(&node.task))
            }
            _ => return,
        };
        let seq = inner.seq;
        inner.seq += 1;
        inner.ready.push(ReadyEntry {
            priority,
            seq,
            task,
        });
        self.work_cv.notify_one();
    }

    /// Completes a node: removes it from the graph, strips its edge from
    /// every dependent, schedules dependents that just became ready, and
    /// notifies waiters (outside the graph lock) exactly once.
    fn finish(&self, task: &Arc<Task>) {
        let waiters = {
            let mut inner = self.inner.lock().unwrap();
            inner.running -= 1;
            let id = task.id();
            let mut waiters = Vec::new();
            if let Some(node) = inner.nodes.remove(&id) {
                waiters = node.waiters;
                let mut newly_ready = Vec::new();
                for dep_id in node.dependents {
                    if let Some(dependent) = inner.nodes.get_mut(&dep_id) {
                        dependent.deps.remove(&id);
                        if dependent.deps.is_empty() && !dependent.scheduled {
                            newly_ready.push(dep_id);
                        }
                    }
                }
                for dep_id in newly_ready {
                    self.schedule_locked(&mut inner, dep_id);
                }
            }
            if inner.nodes.is_empty() && inner.running == 0 {
                self.idle_cv.notify_all();
            }
            waiters
        };
        for group in waiters {
            group.done();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut inner = shared.inner.lock().unwrap();
            loop {
                if inner.shutdown {
                    return;
                }
                if let Some(entry) = inner.ready.pop() {
                    inner.running += 1;
                    break entry.task;
                }
                inner = shared.work_cv.wait(inner).unwrap();
            }
        };

        if let Err(error) = execute(&task) {
            shared.failures.lock().unwrap().push(TaskFailure {
                label: task.label().to_string(),
                error,
            });
        }
        shared.finish(&task);
    }
}

/// Runs a task's closure, converting a panic into a recorded error so one
/// failing node cannot take down the worker pool.
fn execute(task: &Arc<Task>) -> Result<(), TaskError> {
    let Some(job) = task.take_job() else {
        return Ok(());
    };
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::new(panic_message(&payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}
