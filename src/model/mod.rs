pub mod normalize;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel link target: the flow may end at this point.
pub const END: i64 = -1;

/// Pseudo step index appended to a step sequence when the reaper evicts a
/// stalled instance.
pub const STEP_TIMEOUT: i64 = -2;

/// Kind of a step in a flow definition.
///
/// Only `BranchIf`, `BranchElseIf` and `BranchLoop` are structural: they carry
/// no matching key and are resolved away at load time. `Follow` and `Stop` are
/// matchable like `Plain` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Plain,
    BranchIf,
    BranchElseIf,
    BranchLoop,
    Follow,
    Stop,
}

impl StepKind {
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            StepKind::BranchIf | StepKind::BranchElseIf | StepKind::BranchLoop
        )
    }
}

/// One step of a raw flow as produced by the external flow-definition parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_kind")]
    pub kind: StepKind,
    #[serde(default)]
    pub indent: u32,
}

fn default_kind() -> StepKind {
    StepKind::Plain
}

/// A parsed flow definition before normalization.
///
/// `links` is the raw adjacency map: for each step index, the list of step
/// indices that may follow it, where [`END`] marks "the flow may end here".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFlow {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub links: HashMap<usize, Vec<i64>>,
    /// Per-flow step deadline in milliseconds, overriding the global default.
    #[serde(default)]
    pub max_step_exec_time: Option<u64>,
}

fn default_version() -> String {
    "0.0.1".to_string()
}

impl RawFlow {
    /// Registry key, `name(version)`.
    pub fn key(&self) -> String {
        flow_key(&self.name, &self.version)
    }
}

pub fn flow_key(name: &str, version: &str) -> String {
    format!("{}({})", name, version)
}
