//! Sequential executor for workflow graphs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scholar_core::{Error, Result};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info};

use super::graph::GraphDefinition;
use super::state::WorkflowState;

/// Executes registered graphs one node at a time.
///
/// Node N+1 starts only after node N returns. A node that errors or exceeds
/// the per-node time budget aborts the run immediately; the caller receives
/// the failure wrapped with the node name and no partial state. Retry, where
/// appropriate, is a node's own responsibility — the runner never retries.
pub struct WorkflowRunner {
    /// Registered graphs by name, shared read-only across runs.
    graphs: HashMap<String, Arc<GraphDefinition>>,
    /// Per-node time budget.
    node_timeout: Duration,
}

impl WorkflowRunner {
    /// Creates a runner with the given per-node time budget.
    #[must_use]
    pub fn new(node_timeout: Duration) -> Self {
        Self {
            graphs: HashMap::new(),
            node_timeout,
        }
    }

    /// Registers a graph under its own name.
    #[must_use]
    pub fn register(mut self, graph: GraphDefinition) -> Self {
        self.graphs.insert(graph.name().to_owned(), Arc::new(graph));
        self
    }

    /// Names of all registered graphs.
    pub fn graph_names(&self) -> Vec<&str> {
        self.graphs.keys().map(String::as_str).collect()
    }

    /// Runs a graph to completion over the caller's payload.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for unknown graph names or non-object
    /// payloads, and a node-wrapped failure if any node errors or times out.
    pub async fn run(&self, graph_name: &str, payload: Value) -> Result<WorkflowState> {
        let graph = self.graphs.get(graph_name).ok_or_else(|| {
            Error::InvalidParameter(format!("unknown workflow graph '{graph_name}'"))
        })?;

        let mut state = WorkflowState::from_payload(payload)?;
        let mut current = graph.entry();

        info!("running workflow '{graph_name}'");
        loop {
            let node = graph.node(current);
            let node_name = node.name();
            debug!("workflow '{graph_name}': entering node '{node_name}'");

            let outcome = match timeout(self.node_timeout, node.run(&state)).await {
                Err(_elapsed) => {
                    return Err(Error::Timeout(self.node_timeout).at_node(node_name));
                }
                Ok(Err(error)) => return Err(error.at_node(node_name)),
                Ok(Ok(outcome)) => outcome,
            };

            state.apply(outcome.update);

            match graph.resolve(current, outcome.next) {
                Err(error) => return Err(error.at_node(node_name)),
                Ok(None) => break,
                Ok(Some(next)) => current = next,
            }
        }

        info!("workflow '{graph_name}' completed");
        Ok(state)
    }
}
