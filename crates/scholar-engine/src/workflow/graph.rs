//! Immutable graph definitions over named workflow nodes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use scholar_core::{Error, Result};

use super::state::{StateUpdate, WorkflowState};

/// Designated terminal marker for graph edges.
pub const END: &str = "END";

/// One processing step in a workflow graph.
///
/// A node reads a subset of the run state and returns a partial update plus
/// the transition to take. Side effects (retrieval, generation, persistence)
/// are the node's own responsibility — the executor performs no I/O.
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    /// Stable node name used for wiring and failure reporting.
    fn name(&self) -> &'static str;

    /// Runs the node against the current state.
    ///
    /// # Errors
    /// Any error aborts the run; the executor wraps it with this node's name.
    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome>;
}

/// A node's output: the state fields it writes and where to go next.
#[derive(Debug)]
pub struct NodeOutcome {
    /// Partial state update to merge.
    pub update: StateUpdate,
    /// Transition to the next node.
    pub next: Transition,
}

impl NodeOutcome {
    /// Proceed along the node's sole declared successor.
    #[must_use]
    pub fn advance(update: StateUpdate) -> Self {
        Self {
            update,
            next: Transition::Continue,
        }
    }

    /// Proceed to a specific declared successor (conditional edge).
    #[must_use]
    pub fn branch(update: StateUpdate, successor: &'static str) -> Self {
        Self {
            update,
            next: Transition::To(successor),
        }
    }
}

/// Where a node sends the run after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Take the single statically-declared successor.
    Continue,
    /// Take the named successor; it must be statically declared.
    To(&'static str),
}

/// Resolved edge target inside a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeTarget {
    /// Another node, by index.
    Node(usize),
    /// The terminal marker.
    End,
}

/// An immutable, validated workflow graph.
///
/// Node names are resolved to indices at construction, so execution never
/// dispatches on strings. Shared read-only across all runs.
pub struct GraphDefinition {
    /// Graph name used for lookup and logging.
    name: String,
    /// Nodes in declaration order.
    nodes: Vec<Arc<dyn WorkflowNode>>,
    /// Declared successors per node: `(label, resolved target)`.
    successors: Vec<Vec<(String, EdgeTarget)>>,
    /// Entry node index.
    entry: usize,
}

impl GraphDefinition {
    /// Starts building a graph with the given name.
    #[must_use]
    pub fn builder<T: Into<String>>(name: T) -> GraphBuilder {
        GraphBuilder {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
        }
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry node index.
    pub(crate) fn entry(&self) -> usize {
        self.entry
    }

    /// Node by index.
    pub(crate) fn node(&self, index: usize) -> &Arc<dyn WorkflowNode> {
        &self.nodes[index]
    }

    /// Resolves a node's transition against its declared successors.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the transition names an undeclared
    /// successor — nodes may only select among statically-declared edges.
    pub(crate) fn resolve(&self, index: usize, transition: Transition) -> Result<Option<usize>> {
        let declared = &self.successors[index];
        let target = match transition {
            Transition::Continue => declared.first().map(|(_, target)| *target),
            Transition::To(label) => declared
                .iter()
                .find(|(declared_label, _)| declared_label == label)
                .map(|(_, target)| *target),
        };

        match target {
            Some(EdgeTarget::Node(next)) => Ok(Some(next)),
            Some(EdgeTarget::End) => Ok(None),
            None => Err(Error::InvalidParameter(format!(
                "node '{}' selected an undeclared successor",
                self.nodes[index].name()
            ))),
        }
    }
}

/// Builder collecting nodes and edges before validation.
pub struct GraphBuilder {
    /// Graph name.
    name: String,
    /// Nodes in declaration order.
    nodes: Vec<Arc<dyn WorkflowNode>>,
    /// Declared edges as `(from, to)` name pairs; `to` may be [`END`].
    edges: Vec<(String, String)>,
    /// Declared entry node name.
    entry: Option<String>,
}

impl GraphBuilder {
    /// Adds a node. Names must be unique within the graph.
    #[must_use]
    pub fn node(mut self, node: Arc<dyn WorkflowNode>) -> Self {
        self.nodes.push(node);
        self
    }

    /// Declares an edge between two named nodes.
    #[must_use]
    pub fn edge<F: Into<String>, T: Into<String>>(mut self, from: F, to: T) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Declares an edge from a node to the terminal marker.
    #[must_use]
    pub fn edge_to_end<F: Into<String>>(self, from: F) -> Self {
        self.edge(from, END)
    }

    /// Declares the entry node.
    #[must_use]
    pub fn entry<T: Into<String>>(mut self, name: T) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Validates the wiring and freezes the graph.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if node names collide, an edge references
    /// an unknown node, a node has no outgoing edge, the entry is missing,
    /// or the edges form a cycle.
    pub fn build(self) -> Result<GraphDefinition> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (position, node) in self.nodes.iter().enumerate() {
            if index.insert(node.name().to_owned(), position).is_some() {
                return Err(Error::InvalidParameter(format!(
                    "graph '{}' declares node '{}' twice",
                    self.name,
                    node.name()
                )));
            }
        }

        let entry_name = self.entry.ok_or_else(|| {
            Error::InvalidParameter(format!("graph '{}' has no entry node", self.name))
        })?;
        let entry = *index.get(&entry_name).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "graph '{}' entry '{entry_name}' is not a declared node",
                self.name
            ))
        })?;

        let mut successors: Vec<Vec<(String, EdgeTarget)>> = vec![Vec::new(); self.nodes.len()];
        for (from, to) in self.edges {
            let from_index = *index.get(&from).ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "graph '{}' edge from unknown node '{from}'",
                    self.name
                ))
            })?;
            let target = if to == END {
                EdgeTarget::End
            } else {
                EdgeTarget::Node(*index.get(&to).ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "graph '{}' edge to unknown node '{to}'",
                        self.name
                    ))
                })?)
            };
            successors[from_index].push((to, target));
        }

        for (position, declared) in successors.iter().enumerate() {
            if declared.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "graph '{}' node '{}' has no outgoing edge",
                    self.name,
                    self.nodes[position].name()
                )));
            }
        }

        // Cycle check over the node-to-node edges.
        let mut topology: DiGraph<usize, ()> = DiGraph::new();
        let petgraph_nodes: Vec<_> = (0..self.nodes.len())
            .map(|position| topology.add_node(position))
            .collect();
        for (from_index, declared) in successors.iter().enumerate() {
            for (_, target) in declared {
                if let EdgeTarget::Node(to_index) = target {
                    topology.add_edge(petgraph_nodes[from_index], petgraph_nodes[*to_index], ());
                }
            }
        }
        if is_cyclic_directed(&topology) {
            return Err(Error::InvalidParameter(format!(
                "graph '{}' contains a cycle",
                self.name
            )));
        }

        Ok(GraphDefinition {
            name: self.name,
            nodes: self.nodes,
            successors,
            entry,
        })
    }
}
