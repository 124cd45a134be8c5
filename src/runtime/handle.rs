use crate::runtime::engine::{Engine, SharedInstance};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Per-instance logging handle returned by `init`.
///
/// Proxies every call to the matching engine with the instance attached.
/// The handle stays valid after its flow is flushed; late `info` calls are
/// then reported on the error channel instead of advancing anything.
pub struct FlowHandle {
    engine: Arc<Engine>,
    instance: SharedInstance,
    id: Uuid,
}

impl FlowHandle {
    pub(crate) fn new(engine: Arc<Engine>, instance: SharedInstance, id: Uuid) -> Self {
        Self {
            engine,
            instance,
            id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn instance(&self) -> &SharedInstance {
        &self.instance
    }

    /// Match a step message against the flow graph.
    pub fn info(&self, msg: &str) {
        self.engine.record(&self.instance, msg);
    }

    /// Report an unexpected scenario on the error channel. Does not affect
    /// the state machine.
    pub fn error(&self, msg: &str, data: Option<Value>) {
        self.engine.record_err(&self.instance, msg, data);
    }

    /// Log extra data; `tag` lets the control plane mute it at runtime.
    pub fn debug(&self, data: Value, tag: Option<&str>) {
        self.engine.record_data(&self.instance, data, tag);
    }

    pub fn warn(&self, data: Value, tag: Option<&str>) {
        self.engine.record_warn(&self.instance, data, tag);
    }

    pub fn trace(&self, data: Value, tag: Option<&str>) {
        self.engine.record_trace(&self.instance, data, tag);
    }

    /// Signal flow completion. Optional after a step that can only end the
    /// flow; calling it twice is a no-op.
    pub fn end(&self) {
        self.engine.end(&self.instance);
    }
}
