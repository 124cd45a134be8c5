use crate::error::FlowError;
use crate::model::{END, RawFlow, Step};
use std::collections::{HashMap, HashSet};

/// Runtime-ready form of a flow definition.
///
/// Branch steps are resolved away: `start_steps` and every value in `links`
/// refer either to a matchable step or to the [`END`] sentinel. Built once at
/// load time and read-only afterwards.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    pub steps: Vec<Step>,
    /// First matchable steps reachable from the flow's entry point.
    pub start_steps: Vec<i64>,
    /// Fully resolved adjacency for non-branch steps with outgoing edges.
    pub links: HashMap<usize, Vec<i64>>,
    /// Message text to step index, for non-branch steps with outgoing edges.
    pub steps_index: HashMap<String, usize>,
}

impl FlowGraph {
    /// Resolved next steps of `step`, empty when the step has none.
    pub fn next_of(&self, step: usize) -> &[i64] {
        self.links.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the position described by `next` allows the flow to end
    /// without taking another step.
    pub fn points_to_end(next: &[i64]) -> bool {
        next.is_empty() || next.contains(&END)
    }

    /// True when some sequence of valid transitions from `next` reaches the
    /// end sentinel. Used by the reaper to tell a legitimate idle position
    /// from a true stall.
    pub fn can_reach_end(&self, next: &[i64]) -> bool {
        let mut stack: Vec<i64> = next.to_vec();
        let mut visited = HashSet::new();
        while let Some(target) = stack.pop() {
            if target == END {
                return true;
            }
            if !visited.insert(target) {
                continue;
            }
            stack.extend_from_slice(self.next_of(target as usize));
        }
        false
    }
}

/// Transform a raw flow into its normalized graph.
///
/// Fails with [`FlowError::MalformedFlow`] when a branch step has no body: a
/// branch must be immediately followed by a step of strictly greater indent.
pub fn normalize(raw: &RawFlow) -> Result<FlowGraph, FlowError> {
    validate_branches(raw)?;

    let start_steps = find_start_steps(raw);

    let mut steps_index = HashMap::new();
    let mut links = HashMap::new();
    for step in &raw.steps {
        if !step.kind.is_branch() && raw.links.contains_key(&step.index) {
            steps_index.insert(step.message.clone(), step.index);
            let mut resolved = Vec::new();
            for &target in &raw.links[&step.index] {
                resolve_non_branch(raw, target, &mut HashSet::new(), &mut resolved);
            }
            links.insert(step.index, resolved);
        }
    }

    Ok(FlowGraph {
        steps: raw.steps.clone(),
        start_steps,
        links,
        steps_index,
    })
}

fn validate_branches(raw: &RawFlow) -> Result<(), FlowError> {
    for (i, step) in raw.steps.iter().enumerate() {
        if !step.kind.is_branch() {
            continue;
        }
        let body = raw.steps.get(i + 1);
        if body.is_none_or(|b| b.indent <= step.indent) {
            return Err(FlowError::MalformedFlow {
                flow: raw.name.clone(),
                step: i,
            });
        }
    }
    Ok(())
}

/// Walk from step 0 through any chain of branch steps until only matchable
/// step indices remain.
fn find_start_steps(raw: &RawFlow) -> Vec<i64> {
    let mut start = Vec::new();
    let mut stack: Vec<i64> = vec![0];
    let mut visited = HashSet::new();
    while let Some(target) = stack.pop() {
        if !visited.insert(target) {
            continue;
        }
        let is_branch = target != END
            && raw
                .steps
                .get(target as usize)
                .is_some_and(|s| s.kind.is_branch());
        if is_branch {
            if let Some(next) = raw.links.get(&(target as usize)) {
                stack.extend_from_slice(next);
            }
        } else {
            start.push(target);
        }
    }
    start
}

/// Replace a branch target with the concatenation of its own resolved
/// targets. Order is preserved and duplicates are kept: callers test
/// membership, not arity, so repeated indices from converging branch paths
/// are harmless. `visiting` only guards against branch-to-branch cycles.
fn resolve_non_branch(raw: &RawFlow, target: i64, visiting: &mut HashSet<i64>, out: &mut Vec<i64>) {
    let is_branch = target != END
        && raw
            .steps
            .get(target as usize)
            .is_some_and(|s| s.kind.is_branch());
    if !is_branch {
        out.push(target);
        return;
    }
    if !visiting.insert(target) {
        return;
    }
    if let Some(next) = raw.links.get(&(target as usize)) {
        for &t in next {
            resolve_non_branch(raw, t, visiting, out);
        }
    }
}
