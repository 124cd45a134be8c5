//! Validates that an application's sequence of log calls matches a
//! pre-declared execution graph, and emits structured records describing
//! conformance, deviation and timing.
//!
//! Flow definitions are loaded once at startup, normalized into a graph of
//! matchable steps, and matched at runtime against per-instance state. A
//! background reaper evicts stalled instances; a control plane can mute
//! side-channel output per tag, per flow and per dispatch type.

pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod output;
pub mod runtime;

pub use config::{AppenderConfig, AttachFilter, Config};
pub use error::FlowError;
pub use model::{RawFlow, Step, StepKind};
pub use output::{Appender, ChannelType, Layout, Level, LogRecord};
pub use runtime::control::{ControlConfig, SideChannel};
pub use runtime::handle::FlowHandle;

use runtime::engine::Engine;
use runtime::reaper::Reaper;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry point: loads flow definitions once, then hands out per-instance
/// logging handles.
#[derive(Clone)]
pub struct Stepflow {
    engine: Arc<Engine>,
    reap_interval: Duration,
}

impl Stepflow {
    /// Load `raw_flows` against `config` and attach the configured
    /// appenders. A structurally malformed flow is skipped with an error
    /// log; invalid configuration fails outright.
    pub fn new(config: Config, raw_flows: Vec<RawFlow>) -> Result<Self, FlowError> {
        let reap_interval = config.reap_interval;
        Ok(Self {
            engine: Arc::new(Engine::new(config, raw_flows)?),
            reap_interval,
        })
    }

    /// Start one instance of a flow and emit its head record.
    ///
    /// `version` may be omitted when only one version of the flow is
    /// loaded. A `parent` makes this a sub-flow whose failure cascades to
    /// the parent instance.
    pub fn init(
        &self,
        name: &str,
        version: Option<&str>,
        head_msg: Option<&str>,
        parent: Option<&FlowHandle>,
    ) -> Result<FlowHandle, FlowError> {
        let instance =
            self.engine
                .register(name, version, head_msg, parent.map(|p| p.instance()))?;
        let id = instance
            .lock()
            .map(|inst| inst.id)
            .unwrap_or_else(|p| p.into_inner().id);
        Ok(FlowHandle::new(self.engine.clone(), instance, id))
    }

    /// Mute tags, flows or dispatch types at runtime.
    pub fn pause(&self, config: ControlConfig) {
        self.engine.pause(&config);
    }

    /// Undo a previous `pause` for the given tags, flows or types.
    pub fn play(&self, config: ControlConfig) {
        self.engine.play(&config);
    }

    /// Force-flush every active instance as failed with `msg`. The only
    /// cancellation primitive; used for shutdown and fatal conditions.
    pub fn flush_all(&self, msg: &str) {
        self.engine.flush_all(msg);
    }

    /// Evict stalled instances now. Normally driven by [`spawn_reaper`];
    /// exposed for callers without a tokio runtime.
    ///
    /// [`spawn_reaper`]: Stepflow::spawn_reaper
    pub fn reap_stalled(&self) {
        self.engine.reap(Instant::now());
    }

    /// Spawn the background reaper on the current tokio runtime.
    pub fn spawn_reaper(&self) -> tokio::task::JoinHandle<()> {
        let reaper = Reaper::new(self.engine.clone(), self.reap_interval);
        tokio::spawn(reaper.run())
    }

    /// Number of in-progress flow instances.
    pub fn active_count(&self) -> usize {
        self.engine.active_count()
    }

    /// Number of loaded flow definitions.
    pub fn flow_count(&self) -> usize {
        self.engine.registry().len()
    }
}
