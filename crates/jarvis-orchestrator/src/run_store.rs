//! The Run/Node arena: spec.md §9's "arena + index" design note. Runs hold
//! an ordered `Vec<NodeId>`; node bodies live in a separate map keyed by
//! `NodeId`. Readers get a cloned snapshot so a long-running action never
//! holds the store lock.

use std::collections::HashMap;
use std::sync::Mutex;

use jarvis_model::{AgentKind, JarvisError, NodeExecution, NodeId, Run, RunError, RunId};

#[derive(Default)]
struct Inner {
    runs: HashMap<RunId, Run>,
    nodes: HashMap<NodeId, NodeExecution>,
}

/// Shared, lock-protected store for every run and node known to this
/// orchestrator instance. One process-wide instance, injected into the
/// orchestrator and every agent handler rather than reached for globally
/// (spec.md §9's "global mutable state" design note).
#[derive(Default)]
pub struct RunStore {
    inner: Mutex<Inner>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("run store mutex poisoned")
    }

    pub fn insert_run(&self, run: Run) {
        self.lock().runs.insert(run.id, run);
    }

    pub fn get_run(&self, run_id: RunId) -> Option<Run> {
        self.lock().runs.get(&run_id).cloned()
    }

    pub fn list_runs(&self) -> Vec<Run> {
        self.lock().runs.values().cloned().collect()
    }

    pub fn list_runs_by_agent(&self, kind: AgentKind) -> Vec<Run> {
        self.lock()
            .runs
            .values()
            .filter(|run| run.agent_kind == kind)
            .cloned()
            .collect()
    }

    /// Applies `mutate` to the stored run under the lock and returns its
    /// value, or `RunNotFound` if the run has never been inserted.
    pub fn mutate_run<R>(&self, run_id: RunId, mutate: impl FnOnce(&mut Run) -> R) -> Result<R, JarvisError> {
        let mut guard = self.lock();
        let run = guard.runs.get_mut(&run_id).ok_or(JarvisError::RunNotFound(run_id))?;
        Ok(mutate(run))
    }

    /// Appends a node to the arena and to its owning run's `node_ids`.
    /// `node_ids` is append-only for the lifetime of a run per the spec's
    /// run invariant; nothing in this crate ever removes an entry.
    pub fn append_node(&self, node: NodeExecution) -> Result<NodeId, JarvisError> {
        let mut guard = self.lock();
        let run = guard.runs.get_mut(&node.run_id).ok_or(JarvisError::RunNotFound(node.run_id))?;
        let node_id = node.id;
        run.node_ids.push(node_id);
        guard.nodes.insert(node_id, node);
        Ok(node_id)
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<NodeExecution> {
        self.lock().nodes.get(&node_id).cloned()
    }

    pub fn update_node(&self, node_id: NodeId, mutate: impl FnOnce(&mut NodeExecution)) -> Result<(), JarvisError> {
        let mut guard = self.lock();
        let node = guard.nodes.get_mut(&node_id).ok_or(JarvisError::NodeNotFound(node_id))?;
        mutate(node);
        Ok(())
    }

    /// Nodes for `run_id` in append (creation) order.
    pub fn nodes_for_run(&self, run_id: RunId) -> Vec<NodeExecution> {
        let guard = self.lock();
        let Some(run) = guard.runs.get(&run_id) else {
            return Vec::new();
        };
        run.node_ids
            .iter()
            .filter_map(|node_id| guard.nodes.get(node_id).cloned())
            .collect()
    }

    /// Atomically checks and increments the run's LLM-call counter.
    /// Fails `BudgetExceeded` *before* incrementing when the next call
    /// would push the count above `max_llm_calls`, so a failed reservation
    /// never counts against the budget.
    pub fn try_reserve_llm_call(&self, run_id: RunId, max_llm_calls: u32) -> Result<(), JarvisError> {
        self.mutate_run(run_id, |run| {
            if run.llm_call_count >= max_llm_calls {
                return Err(JarvisError::BudgetExceeded(format!(
                    "run {run_id} already used {max_llm_calls} LLM calls (MAX_LLM_CALLS_PER_RUN)"
                )));
            }
            run.llm_call_count += 1;
            Ok(())
        })?
    }

    /// Same shape as [`Self::try_reserve_llm_call`] for the browser-step
    /// budget.
    pub fn try_reserve_browser_step(&self, run_id: RunId, max_browser_steps: u32) -> Result<(), JarvisError> {
        self.mutate_run(run_id, |run| {
            if run.browser_step_count >= max_browser_steps {
                return Err(JarvisError::BudgetExceeded(format!(
                    "run {run_id} already used {max_browser_steps} browser steps (MAX_BROWSER_STEPS_PER_RUN)"
                )));
            }
            run.browser_step_count += 1;
            Ok(())
        })?
    }

    pub fn mark_failed(&self, run_id: RunId, error: RunError) {
        let _ = self.mutate_run(run_id, |run| run.mark_failed(error));
    }
}

#[cfg(test)]
mod tests {
    use super::RunStore;
    use jarvis_model::{Agent, AgentKind, NodeExecution, Run};
    use serde_json::json;

    fn seeded_run(store: &RunStore) -> jarvis_model::RunId {
        let agent = Agent::new("gen", AgentKind::Gen);
        let run = Run::new("user-1", agent.id, agent.kind, json!({}), false);
        let id = run.id;
        store.insert_run(run);
        id
    }

    #[test]
    fn unit_append_node_extends_run_node_ids_in_order() {
        let store = RunStore::new();
        let run_id = seeded_run(&store);
        let first = store.append_node(NodeExecution::start(run_id, "a", "gen", json!({}))).unwrap();
        let second = store.append_node(NodeExecution::start(run_id, "b", "gen", json!({}))).unwrap();
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.node_ids, vec![first, second]);
    }

    #[test]
    fn regression_append_node_for_unknown_run_fails_run_not_found() {
        let store = RunStore::new();
        let err = store
            .append_node(NodeExecution::start(jarvis_model::RunId::new(), "a", "gen", json!({})))
            .expect_err("should fail");
        assert_eq!(err.code(), "run_not_found");
    }

    #[test]
    fn functional_llm_call_budget_blocks_once_exhausted_without_overcounting() {
        let store = RunStore::new();
        let run_id = seeded_run(&store);
        assert!(store.try_reserve_llm_call(run_id, 2).is_ok());
        assert!(store.try_reserve_llm_call(run_id, 2).is_ok());
        let err = store.try_reserve_llm_call(run_id, 2).expect_err("third call should be denied");
        assert_eq!(err.code(), "budget_exceeded");
        assert_eq!(store.get_run(run_id).unwrap().llm_call_count, 2);
    }

    #[test]
    fn unit_nodes_for_run_preserves_append_order() {
        let store = RunStore::new();
        let run_id = seeded_run(&store);
        store.append_node(NodeExecution::start(run_id, "first", "gen", json!({}))).unwrap();
        store.append_node(NodeExecution::start(run_id, "second", "gen", json!({}))).unwrap();
        let names: Vec<_> = store.nodes_for_run(run_id).into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
