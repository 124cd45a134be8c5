use crate::output::record::{DataRecord, FlowRecord, HeadRecord, now_millis};
use crate::runtime::registry::FlowDef;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct LastStep {
    pub id: i64,
    pub at: Instant,
}

/// One in-progress execution of a flow, tracked until flushed.
///
/// Mutated only by the matching engine and the reaper, both of which hold
/// the instance's lock. `flushed` stays set after removal from the store so
/// that a handle whose instance is gone can still report late calls.
pub struct FlowInstance {
    pub id: Uuid,
    pub def: Arc<FlowDef>,
    pub head_msg: Option<String>,
    pub next_expected: Vec<i64>,
    pub last_step: LastStep,
    /// Deadline for the next `record` call, pushed forward on every advance.
    pub deadline: Instant,
    pub steps_seq: Vec<(i64, u64)>,
    pub failed: bool,
    pub flushed: bool,
    pub err_msg: String,
    pub parent_flow_id: Option<Uuid>,
    pub parent_step_id: Option<i64>,
    pub start_time: u64,
}

impl FlowInstance {
    pub fn new(
        id: Uuid,
        def: Arc<FlowDef>,
        head_msg: Option<String>,
        parent: Option<(Uuid, i64)>,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            next_expected: def.graph.start_steps.clone(),
            deadline: now + def.max_step_exec_time,
            def,
            head_msg,
            last_step: LastStep { id: -1, at: now },
            steps_seq: Vec::new(),
            failed: false,
            flushed: false,
            err_msg: String::new(),
            parent_flow_id: parent.map(|(id, _)| id),
            parent_step_id: parent.map(|(_, step)| step),
            start_time: now_millis(),
        }
    }

    /// Take `step` as the current position and refresh the deadline.
    pub fn advance(&mut self, step: usize) {
        let now = Instant::now();
        let duration = now.duration_since(self.last_step.at).as_millis() as u64;
        self.steps_seq.push((step as i64, duration));
        self.last_step = LastStep {
            id: step as i64,
            at: now,
        };
        self.deadline = now + self.def.max_step_exec_time;
        self.next_expected = self.def.graph.next_of(step).to_vec();
    }

    pub fn head_record(&self) -> HeadRecord {
        HeadRecord {
            id: self.id,
            flow_name: self.def.name.clone(),
            version: self.def.version.clone(),
            report_time: self.start_time,
            head_msg: self.head_msg.clone(),
            parent_flow_id: self.parent_flow_id,
            parent_step_id: self.parent_step_id,
        }
    }

    pub fn flow_record(&self) -> FlowRecord {
        FlowRecord {
            success: !self.failed,
            flow_name: self.def.name.clone(),
            version: self.def.version.clone(),
            id: self.id,
            report_time: self.start_time,
            steps: self.steps_seq.clone(),
            err_msg: self.err_msg.clone(),
            parent_flow_id: self.parent_flow_id,
            parent_step_id: self.parent_step_id,
        }
    }

    pub fn data_record(&self, msg: impl Into<String>, data: Option<Value>) -> DataRecord {
        DataRecord {
            id: self.id,
            flow_name: self.def.name.clone(),
            version: self.def.version.clone(),
            last_step_id: self.last_step.id,
            msg: msg.into(),
            data,
            report_time: now_millis(),
        }
    }
}
