mod common;

use common::{links, step};
use stepflow::model::normalize::{FlowGraph, normalize};
use stepflow::model::{END, RawFlow};
use stepflow::{FlowError, StepKind};

#[test]
fn test_branch_steps_are_resolved_away() {
    let graph = normalize(&common::first_flow()).expect("valid flow");

    let branch_indices = [1_i64, 3];
    for target in graph.start_steps.iter() {
        assert!(!branch_indices.contains(target));
    }
    for (_, targets) in graph.links.iter() {
        for target in targets {
            assert!(
                !branch_indices.contains(target),
                "links must never point at a branch step, got {target}"
            );
        }
    }
}

#[test]
fn test_links_resolve_through_branch_chains() {
    let graph = normalize(&common::first_flow()).expect("valid flow");

    assert_eq!(graph.start_steps, vec![0]);
    assert_eq!(graph.links[&0], vec![2, 4]);
    assert_eq!(graph.links[&2], vec![2, 4, END]);
    assert_eq!(graph.links[&4], vec![END]);
    assert_eq!(graph.steps_index["until the next condition is true"], 2);
    assert_eq!(graph.steps_index.len(), 3);
}

#[test]
fn test_start_steps_resolved_through_leading_branches() {
    let graph = normalize(&common::update_boundaries()).expect("valid flow");

    let mut start = graph.start_steps.clone();
    start.sort();
    assert_eq!(start, vec![1, 3]);
}

#[test]
fn test_every_fixture_has_start_steps() {
    for raw in common::all_flows() {
        let graph = normalize(&raw).expect("valid flow");
        assert!(!graph.start_steps.is_empty(), "flow {}", raw.name);
    }
}

#[test]
fn test_converging_branch_paths_keep_duplicates() {
    let raw = RawFlow {
        name: "converging".to_string(),
        version: "1".to_string(),
        steps: vec![
            step(0, StepKind::Plain, "enter", 0),
            step(1, StepKind::BranchIf, "", 0),
            step(2, StepKind::Plain, "settle", 1),
        ],
        links: links(&[(0, &[1]), (1, &[2, 2]), (2, &[-1])]),
        max_step_exec_time: None,
    };
    let graph = normalize(&raw).expect("valid flow");

    // Membership checks make repeats harmless, and order is preserved.
    assert_eq!(graph.links[&0], vec![2, 2]);
}

#[test]
fn test_branch_as_last_step_is_malformed() {
    let raw = RawFlow {
        name: "broken".to_string(),
        version: "1".to_string(),
        steps: vec![
            step(0, StepKind::Plain, "enter", 0),
            step(1, StepKind::BranchIf, "", 0),
        ],
        links: links(&[(0, &[1])]),
        max_step_exec_time: None,
    };
    assert!(matches!(
        normalize(&raw),
        Err(FlowError::MalformedFlow { step: 1, .. })
    ));
}

#[test]
fn test_branch_without_nested_body_is_malformed() {
    let raw = RawFlow {
        name: "broken".to_string(),
        version: "1".to_string(),
        steps: vec![
            step(0, StepKind::BranchLoop, "", 0),
            step(1, StepKind::Plain, "same level", 0),
        ],
        links: links(&[(0, &[1]), (1, &[-1])]),
        max_step_exec_time: None,
    };
    assert!(matches!(
        normalize(&raw),
        Err(FlowError::MalformedFlow { step: 0, .. })
    ));
}

#[test]
fn test_end_reachability() {
    let first = normalize(&common::first_flow()).expect("valid flow");
    assert!(first.can_reach_end(&[2, 4]));
    assert!(first.can_reach_end(&[END]));

    let spinner = normalize(&common::spinner()).expect("valid flow");
    assert!(!spinner.can_reach_end(&[1]));

    assert!(FlowGraph::points_to_end(&[2, 4, END]));
    assert!(FlowGraph::points_to_end(&[]));
    assert!(!FlowGraph::points_to_end(&[2, 4]));
}
