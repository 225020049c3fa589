//! The stage dependency graph.
//!
//! Stages live in an arena (`Vec`) and are referenced everywhere by stable
//! index; the string id is only resolved at insertion time. Validation
//! checks the sticky edge-error flag and runs an iterative depth-first
//! cycle search.

use std::collections::{HashMap, HashSet};

use crate::core::{PipelineError, Result};
use crate::scheduler::task::{StageSpec, TaskNode};

/// Directed acyclic graph of stages with must-precede edges.
#[derive(Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
    edges: HashSet<(usize, usize)>,
    /// Edges that referenced unknown stage ids. Sticky: once set, the graph
    /// never validates.
    edge_errors: Vec<String>,
}

impl TaskGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage. Fails on an empty or duplicate id.
    pub fn add_stage(&mut self, spec: StageSpec) -> Result<()> {
        if spec.id.is_empty() {
            return Err(PipelineError::GraphInvalid {
                message: "stage id must be non-empty".to_string(),
            });
        }
        if self.index.contains_key(&spec.id) {
            return Err(PipelineError::GraphInvalid {
                message: format!("stage '{}' already present", spec.id),
            });
        }

        let idx = self.nodes.len();
        self.index.insert(spec.id.clone(), idx);
        self.nodes.push(TaskNode {
            id: spec.id,
            kind: spec.kind,
            priority: spec.priority,
            body: spec.body,
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        Ok(())
    }

    /// Add a must-precede edge: `from` completes before `to` starts.
    ///
    /// An edge against a missing stage is recorded as a sticky error so the
    /// next `validate()` fails even if the caller ignored the returned
    /// error. Duplicate edges are rejected.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let (from_idx, to_idx) = match (self.index.get(from), self.index.get(to)) {
            (Some(&f), Some(&t)) => (f, t),
            _ => {
                let message = format!("edge '{from}' -> '{to}' references an unknown stage");
                tracing::error!(%from, %to, "cannot add dependency edge");
                self.edge_errors.push(message.clone());
                return Err(PipelineError::GraphInvalid { message });
            }
        };

        if !self.edges.insert((from_idx, to_idx)) {
            return Err(PipelineError::GraphInvalid {
                message: format!("duplicate edge '{from}' -> '{to}'"),
            });
        }

        self.nodes[to_idx].predecessors.push(from_idx);
        self.nodes[from_idx].successors.push(to_idx);
        Ok(())
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no stages.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Verify the graph is runnable: no recorded edge errors, no cycles.
    pub fn validate(&self) -> Result<()> {
        if let Some(first) = self.edge_errors.first() {
            return Err(PipelineError::GraphInvalid {
                message: first.clone(),
            });
        }
        if self.has_cycle() {
            return Err(PipelineError::GraphInvalid {
                message: "dependency graph contains a cycle".to_string(),
            });
        }
        Ok(())
    }

    /// Iterative three-color depth-first search over successor edges.
    fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        let mut marks = vec![Mark::White; self.nodes.len()];

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::White {
                continue;
            }

            // Stack of (node, index of the next successor to visit).
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::Gray;

            while let Some((node, child)) = stack.pop() {
                if child < self.nodes[node].successors.len() {
                    stack.push((node, child + 1));
                    let next = self.nodes[node].successors[child];
                    match marks[next] {
                        Mark::Gray => return true,
                        Mark::White => {
                            marks[next] = Mark::Gray;
                            stack.push((next, 0));
                        }
                        Mark::Black => {}
                    }
                } else {
                    marks[node] = Mark::Black;
                }
            }
        }

        false
    }

    /// Human-readable rendering of the graph (ids, priorities, edges).
    pub fn to_text(&self) -> String {
        let mut out = String::from("Dependency graph:\n");
        for node in &self.nodes {
            out.push_str(&format!(
                "stage: {} (priority {})\n",
                node.id, node.priority
            ));
            if !node.predecessors.is_empty() {
                let names: Vec<&str> = node
                    .predecessors
                    .iter()
                    .map(|&p| self.nodes[p].id.as_str())
                    .collect();
                out.push_str(&format!("  predecessors: {}\n", names.join(", ")));
            }
            if !node.successors.is_empty() {
                let names: Vec<&str> = node
                    .successors
                    .iter()
                    .map(|&s| self.nodes[s].id.as_str())
                    .collect();
                out.push_str(&format!("  successors: {}\n", names.join(", ")));
            }
        }
        out
    }

    pub(crate) fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }
}
