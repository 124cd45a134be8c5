use crate::config::Config;
use crate::error::FlowError;
use crate::model::normalize::FlowGraph;
use crate::model::{END, RawFlow, STEP_TIMEOUT};
use crate::output::{ChannelType, Level, LogRecord};
use crate::runtime::control::{ControlConfig, ControlPlane, SideChannel};
use crate::runtime::instance::FlowInstance;
use crate::runtime::registry::FlowRegistry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

pub type SharedInstance = Arc<Mutex<FlowInstance>>;

fn lock(instance: &SharedInstance) -> MutexGuard<'_, FlowInstance> {
    // A poisoned instance is still worth flushing.
    instance.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The matching engine: advances, fails or terminates active flow instances
/// as messages arrive.
///
/// The active-flow store maps instance ids to shared instances; handles keep
/// their own `Arc` so that calls arriving after a flush can still be
/// reported. Every mutation happens under the instance's own mutex, which
/// the reaper acquires as well.
pub struct Engine {
    registry: FlowRegistry,
    instances: DashMap<Uuid, SharedInstance>,
    control: ControlPlane,
}

impl Engine {
    pub fn new(config: Config, raw_flows: Vec<RawFlow>) -> Result<Self, FlowError> {
        config.validate()?;
        Ok(Self {
            registry: FlowRegistry::load(raw_flows, &config),
            instances: DashMap::new(),
            control: ControlPlane::new(),
        })
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn active_count(&self) -> usize {
        self.instances.len()
    }

    /// Create a new instance of a flow and acknowledge it with a head
    /// record. The head record always fires, regardless of pause state.
    pub fn register(
        &self,
        name: &str,
        version: Option<&str>,
        head_msg: Option<&str>,
        parent: Option<&SharedInstance>,
    ) -> Result<SharedInstance, FlowError> {
        let def = self.registry.resolve(name, version)?;
        let parent_ref = parent.map(|p| {
            let parent = lock(p);
            (parent.id, parent.last_step.id)
        });
        let id = Uuid::new_v4();
        let instance = Arc::new(Mutex::new(FlowInstance::new(
            id,
            def,
            head_msg.map(str::to_string),
            parent_ref,
        )));
        self.instances.insert(id, instance.clone());
        {
            let inst = lock(&instance);
            inst.def.emit(
                ChannelType::Head,
                &LogRecord::Head(inst.head_record()),
                Level::Info,
            );
        }
        Ok(instance)
    }

    /// Match `msg` against the instance's expected next steps.
    ///
    /// A mismatch fails and flushes the instance; a match advances it and
    /// auto-flushes as success when the step can only end the flow, so
    /// callers need not call `end` after such steps.
    pub fn record(&self, instance: &SharedInstance, msg: &str) {
        let mut inst = lock(instance);
        if inst.flushed {
            self.report_unexpected(&inst, msg);
            return;
        }
        let step = inst.def.graph.steps_index.get(msg).copied();
        match step {
            Some(step) if inst.next_expected.contains(&(step as i64)) => {
                inst.advance(step);
                if inst.next_expected.iter().all(|&t| t == END) {
                    // Dead end: this step can only terminate the flow.
                    self.flush_locked(&mut inst);
                    let id = inst.id;
                    drop(inst);
                    self.instances.remove(&id);
                }
            }
            _ => {
                let parent = self.fail_locked(&mut inst, format!("invalid step: {msg}"));
                let id = inst.id;
                drop(inst);
                self.instances.remove(&id);
                self.cascade_failure(parent);
            }
        }
    }

    /// Signal that the flow is complete. Idempotent: a second call on a
    /// flushed instance is a no-op.
    pub fn end(&self, instance: &SharedInstance) {
        let mut inst = lock(instance);
        if inst.flushed {
            return;
        }
        let parent = if inst.last_step.id == -1 {
            Some(self.fail_locked(&mut inst, "ended before taking any step".to_string()))
        } else if FlowGraph::points_to_end(&inst.next_expected) {
            self.flush_locked(&mut inst);
            None
        } else {
            let last = inst.def.step_message(inst.last_step.id).to_string();
            Some(self.fail_locked(&mut inst, format!("ended after step: {last}")))
        };
        let id = inst.id;
        drop(inst);
        self.instances.remove(&id);
        if let Some(parent) = parent {
            self.cascade_failure(parent);
        }
    }

    pub fn record_err(&self, instance: &SharedInstance, msg: &str, data: Option<Value>) {
        self.side_channel(
            instance,
            SideChannel::Error,
            msg,
            data,
            None,
            ChannelType::Error,
            Level::Error,
        );
    }

    pub fn record_warn(&self, instance: &SharedInstance, data: Value, tag: Option<&str>) {
        self.side_channel(
            instance,
            SideChannel::Warn,
            "",
            Some(data),
            tag,
            ChannelType::Data,
            Level::Warn,
        );
    }

    pub fn record_data(&self, instance: &SharedInstance, data: Value, tag: Option<&str>) {
        self.side_channel(
            instance,
            SideChannel::Data,
            "",
            Some(data),
            tag,
            ChannelType::Data,
            Level::Debug,
        );
    }

    pub fn record_trace(&self, instance: &SharedInstance, data: Value, tag: Option<&str>) {
        self.side_channel(
            instance,
            SideChannel::Trace,
            "",
            Some(data),
            tag,
            ChannelType::Data,
            Level::Trace,
        );
    }

    /// Force-flush every active instance as failed with `msg`. Used on
    /// process shutdown and fatal conditions.
    ///
    /// Each instance is flushed and removed individually under its own
    /// mutex; instances registered while the flush runs are untouched and
    /// stay in the store.
    pub fn flush_all(&self, msg: &str) {
        let active: Vec<SharedInstance> =
            self.instances.iter().map(|e| e.value().clone()).collect();
        for instance in active {
            let mut inst = lock(&instance);
            if inst.flushed {
                continue;
            }
            inst.failed = true;
            inst.err_msg = msg.to_string();
            self.flush_locked(&mut inst);
            let id = inst.id;
            drop(inst);
            self.instances.remove(&id);
        }
    }

    /// Evict every instance whose per-step deadline has passed. Whether the
    /// end sentinel is reachable from the current position decides if the
    /// idle state was a legitimate pause or a true stall.
    pub fn reap(&self, now: Instant) {
        let active: Vec<SharedInstance> =
            self.instances.iter().map(|e| e.value().clone()).collect();
        for instance in active {
            let mut inst = lock(&instance);
            // A late record call may have pushed the deadline forward.
            if inst.flushed || inst.deadline > now {
                continue;
            }
            if inst.def.graph.can_reach_end(&inst.next_expected) {
                debug!(instance = %inst.id, flow = %inst.def.key, "evicting idle flow as complete");
            } else {
                let idle = now.duration_since(inst.last_step.at).as_millis() as u64;
                inst.failed = true;
                inst.err_msg = "step timed out".to_string();
                inst.steps_seq.push((STEP_TIMEOUT, idle));
                warn!(instance = %inst.id, flow = %inst.def.key, idle_ms = idle, "evicting stalled flow");
            }
            self.flush_locked(&mut inst);
            let id = inst.id;
            drop(inst);
            self.instances.remove(&id);
        }
    }

    pub fn pause(&self, config: &ControlConfig) {
        self.control.pause_keys(&config.keys);
        self.control.pause_types(&config.types);
        for flow in &config.flows {
            self.registry.set_paused(flow, true);
        }
    }

    pub fn play(&self, config: &ControlConfig) {
        self.control.play_keys(&config.keys);
        self.control.play_types(&config.types);
        for flow in &config.flows {
            self.registry.set_paused(flow, false);
        }
    }

    /// All three mute axes must pass: dispatch-type gate, tag filter and the
    /// owning flow's paused flag. A blocked call is dropped, not buffered.
    fn side_channel(
        &self,
        instance: &SharedInstance,
        kind: SideChannel,
        msg: &str,
        data: Option<Value>,
        tag: Option<&str>,
        channel: ChannelType,
        level: Level,
    ) {
        if !self.control.channel_enabled(kind) || !self.control.tag_enabled(tag) {
            return;
        }
        let inst = lock(instance);
        if inst.flushed || inst.def.is_paused() {
            return;
        }
        let record = LogRecord::Data(inst.data_record(msg, data));
        inst.def.emit(channel, &record, level);
    }

    /// Mark the instance failed, report the reason on its error channel and
    /// flush. Returns the parent to cascade to, if any.
    fn fail_locked(&self, inst: &mut FlowInstance, err_msg: String) -> Option<Uuid> {
        inst.failed = true;
        inst.err_msg = err_msg.clone();
        let record = LogRecord::Data(inst.data_record(err_msg, None));
        inst.def.emit(ChannelType::Error, &record, Level::Error);
        self.flush_locked(inst);
        inst.parent_flow_id
    }

    /// Single point of destruction: emit the terminal flow record and mark
    /// the instance flushed. The caller removes it from the store once the
    /// lock is released; the id is never reused.
    fn flush_locked(&self, inst: &mut FlowInstance) {
        inst.flushed = true;
        inst.def.emit(
            ChannelType::Flows,
            &LogRecord::Flow(inst.flow_record()),
            Level::Info,
        );
    }

    /// A sub-flow failure terminates its ancestors, even where their own
    /// graph position was still valid. The parent link is a weak reference:
    /// an already-flushed ancestor stops the walk.
    fn cascade_failure(&self, mut parent_id: Option<Uuid>) {
        while let Some(id) = parent_id {
            let Some(instance) = self.instances.get(&id).map(|e| e.value().clone()) else {
                return;
            };
            let mut inst = lock(&instance);
            if inst.flushed {
                return;
            }
            inst.failed = true;
            inst.err_msg = "Subflow failed".to_string();
            self.flush_locked(&mut inst);
            parent_id = inst.parent_flow_id;
            drop(inst);
            self.instances.remove(&id);
        }
    }

    fn report_unexpected(&self, inst: &FlowInstance, msg: &str) {
        warn!(instance = %inst.id, flow = %inst.def.key, step = msg, "call on a flushed flow");
        let record = LogRecord::Data(inst.data_record(format!("unexpected step: {msg}"), None));
        inst.def.emit(ChannelType::Error, &record, Level::Error);
    }
}
