#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stepflow::output::record::{DataRecord, FlowRecord, HeadRecord};
use stepflow::{AppenderConfig, Config, Level, LogRecord, RawFlow, Step, StepKind, Stepflow};

/// Collects every appended record for assertions.
#[derive(Default)]
pub struct MemoryAppender {
    events: Mutex<Vec<(Level, LogRecord)>>,
}

impl MemoryAppender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(Level, LogRecord)> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn head_records(&self) -> Vec<HeadRecord> {
        self.events()
            .into_iter()
            .filter_map(|(_, r)| match r {
                LogRecord::Head(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn flow_records(&self) -> Vec<FlowRecord> {
        self.events()
            .into_iter()
            .filter_map(|(_, r)| match r {
                LogRecord::Flow(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn data_records(&self) -> Vec<(Level, DataRecord)> {
        self.events()
            .into_iter()
            .filter_map(|(l, r)| match r {
                LogRecord::Data(d) => Some((l, d)),
                _ => None,
            })
            .collect()
    }
}

impl stepflow::Appender for MemoryAppender {
    fn append(&self, record: &LogRecord, level: Level) {
        self.events.lock().unwrap().push((level, record.clone()));
    }
}

pub fn step(index: usize, kind: StepKind, message: &str, indent: u32) -> Step {
    Step {
        index,
        message: message.to_string(),
        kind,
        indent,
    }
}

pub fn links(pairs: &[(usize, &[i64])]) -> HashMap<usize, Vec<i64>> {
    pairs.iter().map(|(k, v)| (*k, v.to_vec())).collect()
}

/// A loop whose body may repeat, then complete through a branch:
///
/// ```text
/// 0 this is the sample flow
/// 1 LOOP
/// 2   until the next condition is true   (may loop or end here)
/// 3 IF
/// 4   mark it complete                   (can only end the flow)
/// ```
pub fn first_flow() -> RawFlow {
    RawFlow {
        name: "first flow".to_string(),
        version: "0.0.1".to_string(),
        steps: vec![
            step(0, StepKind::Plain, "this is the sample flow", 0),
            step(1, StepKind::BranchLoop, "", 0),
            step(2, StepKind::Plain, "until the next condition is true", 1),
            step(3, StepKind::BranchIf, "", 0),
            step(4, StepKind::Plain, "mark it complete", 1),
        ],
        links: links(&[
            (0, &[1]),
            (1, &[2, 3]),
            (2, &[1, -1]),
            (3, &[4]),
            (4, &[-1]),
        ]),
        max_step_exec_time: None,
    }
}

/// Plain linear flow, loaded in two versions.
pub fn second_flow(version: &str) -> RawFlow {
    RawFlow {
        name: "second flow".to_string(),
        version: version.to_string(),
        steps: vec![
            step(0, StepKind::Plain, "start the job", 0),
            step(1, StepKind::Plain, "process the job", 0),
            step(2, StepKind::Plain, "archive the job", 0),
        ],
        links: links(&[(0, &[1]), (1, &[2]), (2, &[-1])]),
        max_step_exec_time: None,
    }
}

/// Two mandatory steps; ending after the first is premature.
pub fn third_flow() -> RawFlow {
    RawFlow {
        name: "3rd flow".to_string(),
        version: "1".to_string(),
        steps: vec![
            step(0, StepKind::Plain, "first step", 0),
            step(1, StepKind::Plain, "second step", 0),
        ],
        links: links(&[(0, &[1]), (1, &[-1])]),
        max_step_exec_time: None,
    }
}

/// Parent flow for the sub-flow tests; "update boundaries" sits mid-flow.
pub fn binary_search() -> RawFlow {
    RawFlow {
        name: "binary search".to_string(),
        version: "0.0.1".to_string(),
        steps: vec![
            step(0, StepKind::Plain, "read low", 0),
            step(1, StepKind::Plain, "read high", 0),
            step(2, StepKind::Plain, "calculate mid", 0),
            step(3, StepKind::Plain, "update boundaries", 0),
            step(4, StepKind::Plain, "mark found", 0),
        ],
        links: links(&[(0, &[1]), (1, &[2]), (2, &[3]), (3, &[4, -1]), (4, &[-1])]),
        max_step_exec_time: None,
    }
}

/// Starts with a branch pair, so both bodies are start steps.
pub fn update_boundaries() -> RawFlow {
    RawFlow {
        name: "update boundaries".to_string(),
        version: "0.0.1".to_string(),
        steps: vec![
            step(0, StepKind::BranchIf, "", 0),
            step(1, StepKind::Plain, "update low to mid + 1", 1),
            step(2, StepKind::BranchElseIf, "", 0),
            step(3, StepKind::Plain, "update high to mid - 1", 1),
        ],
        links: links(&[(0, &[1, 2]), (1, &[-1]), (2, &[3]), (3, &[-1])]),
        max_step_exec_time: None,
    }
}

/// Once spinning, the end sentinel is unreachable; only the reaper can
/// terminate an idle instance, and it must report a stall.
pub fn spinner() -> RawFlow {
    RawFlow {
        name: "spinner".to_string(),
        version: "1".to_string(),
        steps: vec![
            step(0, StepKind::Plain, "begin the work", 0),
            step(1, StepKind::Plain, "spin", 0),
        ],
        links: links(&[(0, &[1]), (1, &[1])]),
        max_step_exec_time: None,
    }
}

pub fn all_flows() -> Vec<RawFlow> {
    vec![
        first_flow(),
        second_flow("1"),
        second_flow("2"),
        third_flow(),
        binary_search(),
        update_boundaries(),
        spinner(),
    ]
}

/// A `Stepflow` with every fixture loaded and one memory appender attached
/// to all channels of all flows.
pub fn setup() -> (Stepflow, Arc<MemoryAppender>) {
    setup_with(Config::default())
}

pub fn setup_with(mut config: Config) -> (Stepflow, Arc<MemoryAppender>) {
    let appender = MemoryAppender::new();
    config.appenders.push(AppenderConfig::new(appender.clone()));
    let sf = Stepflow::new(config, all_flows()).expect("fixtures load");
    (sf, appender)
}
