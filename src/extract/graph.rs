//! Task graph
//!
//! A small DAG of owned closures executed on the rayon pool. Nodes are
//! created, connected with explicit edges, and the roots pushed; the graph is
//! then consumed by [`TaskGraph::work_and_wait`], which blocks until every
//! reachable node has run. A node becomes runnable once all of its
//! predecessors finished. The first error stops the remaining nodes from doing
//! work and is returned from the wait.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use crate::core::{Error, Result};

/// Work of one node.
pub type TaskFn<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;

/// Handle to a node of a [`TaskGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

struct TaskNode<'a> {
    name: String,
    work: Mutex<Option<TaskFn<'a>>>,
    /// Predecessors not yet finished
    pending: AtomicUsize,
    successors: Vec<usize>,
}

#[derive(Default)]
struct RunState {
    failed: AtomicBool,
    error: Mutex<Option<Error>>,
    executed: AtomicUsize,
}

impl RunState {
    fn fail(&self, name: &str, err: Error) {
        log::debug!("task '{}' failed: {}", name, err);
        if !self.failed.swap(true, Ordering::AcqRel) {
            if let Ok(mut slot) = self.error.lock() {
                *slot = Some(err);
            }
        }
    }
}

/// DAG of tasks borrowing data for `'a`.
#[derive(Default)]
pub struct TaskGraph<'a> {
    nodes: Vec<TaskNode<'a>>,
    roots: Vec<NodeId>,
}

impl<'a> TaskGraph<'a> {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), roots: Vec::new() }
    }

    /// Add a node; it runs only once pushed or reached through an edge.
    pub fn node_create(&mut self, name: impl Into<String>, work: TaskFn<'a>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TaskNode {
            name: name.into(),
            work: Mutex::new(Some(work)),
            pending: AtomicUsize::new(0),
            successors: Vec::new(),
        });
        id
    }

    /// `to` runs after `from` finished.
    pub fn edge_create(&mut self, from: NodeId, to: NodeId) {
        debug_assert!(from.0 < to.0, "edges must point to later nodes");
        self.nodes[from.0].successors.push(to.0);
        self.nodes[to.0].pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark a node without predecessors as a root.
    pub fn push_work(&mut self, node: NodeId) {
        if self.nodes[node.0].pending.load(Ordering::Relaxed) > 0 {
            log::warn!("task '{}' has predecessors; not pushed as root", self.nodes[node.0].name);
            return;
        }
        if !self.roots.contains(&node) {
            self.roots.push(node);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run every reachable node and block until they are done.
    ///
    /// # Returns
    /// The first error raised by a node, if any.
    pub fn work_and_wait(self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let state = RunState::default();
        let nodes = &self.nodes;
        let state_ref = &state;

        rayon::scope(|scope| {
            for root in &self.roots {
                let index = root.0;
                scope.spawn(move |scope| execute(scope, nodes, index, state_ref));
            }
        });

        let executed = state.executed.load(Ordering::Acquire);
        if executed < self.nodes.len() && !state.failed.load(Ordering::Acquire) {
            for node in &self.nodes {
                if node.work.lock().map(|w| w.is_some()).unwrap_or(false) {
                    log::warn!("task '{}' was never reached", node.name);
                }
            }
        }
        log::trace!(
            "task graph: {}/{} nodes in {:.2}ms",
            executed,
            self.nodes.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        match state.error.into_inner() {
            Ok(Some(err)) => Err(err),
            Ok(None) => Ok(()),
            Err(_) => Err(Error::Task("task graph state poisoned".to_string())),
        }
    }
}

fn execute<'s, 'a: 's>(
    scope: &rayon::Scope<'s>,
    nodes: &'s [TaskNode<'a>],
    index: usize,
    state: &'s RunState,
) {
    let node = &nodes[index];
    let work = node.work.lock().ok().and_then(|mut w| w.take());
    if let Some(work) = work {
        state.executed.fetch_add(1, Ordering::AcqRel);
        if !state.failed.load(Ordering::Acquire) {
            log::trace!("task '{}' start", node.name);
            if let Err(err) = work() {
                state.fail(&node.name, err);
            }
        }
    }

    for &next in &node.successors {
        if nodes[next].pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            scope.spawn(move |scope| execute(scope, nodes, next, state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_empty_graph() {
        assert!(TaskGraph::new().work_and_wait().is_ok());
    }

    #[test]
    fn test_dependencies_respected() {
        let order = Mutex::new(Vec::new());
        let mut graph = TaskGraph::new();
        let root = graph.node_create("root", Box::new(|| {
            order.lock().unwrap().push("root");
            Ok(())
        }));
        let mut middles = Vec::new();
        for name in ["a", "b", "c"] {
            let order = &order;
            let n = graph.node_create(name, Box::new(move || {
                order.lock().unwrap().push(name);
                Ok(())
            }));
            graph.edge_create(root, n);
            middles.push(n);
        }
        let barrier = graph.node_create("barrier", Box::new(|| {
            order.lock().unwrap().push("barrier");
            Ok(())
        }));
        for n in middles {
            graph.edge_create(n, barrier);
        }
        graph.push_work(root);
        graph.work_and_wait().unwrap();

        let order = order.into_inner().unwrap();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], "root");
        assert_eq!(order[4], "barrier");
    }

    #[test]
    fn test_closures_mutate_borrowed_state() {
        let mut values = vec![0u32; 4];
        let mut graph = TaskGraph::new();
        let root = graph.node_create("root", Box::new(|| Ok(())));
        for (i, v) in values.iter_mut().enumerate() {
            let n = graph.node_create(format!("set{}", i), Box::new(move || {
                *v = i as u32 + 1;
                Ok(())
            }));
            graph.edge_create(root, n);
        }
        graph.push_work(root);
        graph.work_and_wait().unwrap();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_first_error_skips_successors() {
        let ran = AtomicU32::new(0);
        let mut graph = TaskGraph::new();
        let root = graph.node_create("root", Box::new(|| Err(Error::Task("boom".to_string()))));
        let next = graph.node_create("next", Box::new(|| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        graph.edge_create(root, next);
        graph.push_work(root);
        let err = graph.work_and_wait().unwrap_err();
        assert!(matches!(err, Error::Task(msg) if msg == "boom"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unpushed_root_does_not_run() {
        let ran = AtomicU32::new(0);
        let mut graph = TaskGraph::new();
        graph.node_create("orphan", Box::new(|| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let root = graph.node_create("root", Box::new(|| Ok(())));
        graph.push_work(root);
        graph.work_and_wait().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multiple_roots() {
        let count = AtomicU32::new(0);
        let mut graph = TaskGraph::new();
        for i in 0..8 {
            let count = &count;
            let n = graph.node_create(format!("root{}", i), Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            graph.push_work(n);
        }
        graph.work_and_wait().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 8);
    }
}
