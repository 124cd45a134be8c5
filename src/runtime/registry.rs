use crate::config::Config;
use crate::error::FlowError;
use crate::model::normalize::{FlowGraph, normalize};
use crate::model::{RawFlow, flow_key};
use crate::output::{Appender, CHANNEL_COUNT, ChannelType, Level, LogRecord};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info};

/// A loaded flow definition: its normalized graph plus the appenders
/// attached to each output channel. `paused` is the only field that changes
/// after load, toggled by the control plane.
pub struct FlowDef {
    pub key: String,
    pub name: String,
    pub version: String,
    pub graph: FlowGraph,
    pub max_step_exec_time: Duration,
    channels: [Vec<Arc<dyn Appender>>; CHANNEL_COUNT],
    paused: AtomicBool,
}

impl FlowDef {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Hand a record to every sink attached to `channel`. Sinks own their
    /// buffering; this never blocks the matching path.
    pub fn emit(&self, channel: ChannelType, record: &LogRecord, level: Level) {
        for appender in &self.channels[channel.idx()] {
            appender.append(record, level);
        }
    }

    /// Message text of a step, for failure reasons.
    pub fn step_message(&self, step: i64) -> &str {
        usize::try_from(step)
            .ok()
            .and_then(|i| self.graph.steps.get(i))
            .map(|s| s.message.as_str())
            .unwrap_or("")
    }
}

/// The set of loaded flow definitions, keyed by `name(version)`.
pub struct FlowRegistry {
    flows: DashMap<String, Arc<FlowDef>>,
}

impl FlowRegistry {
    /// Normalize and register each raw flow, attaching the configured
    /// appenders. A malformed flow is fatal for that one definition only:
    /// it is reported and skipped, the rest keep loading.
    pub fn load(raw_flows: Vec<RawFlow>, config: &Config) -> Self {
        let flows = DashMap::new();
        for raw in raw_flows {
            let graph = match normalize(&raw) {
                Ok(graph) => graph,
                Err(e) => {
                    error!(flow = %raw.name, "skipping flow: {e}");
                    continue;
                }
            };
            let key = raw.key();
            let mut channels: [Vec<Arc<dyn Appender>>; CHANNEL_COUNT] = Default::default();
            for appender in &config.appenders {
                if !appender.should_attach(&raw.name, &key) {
                    continue;
                }
                for channel in appender.channels() {
                    channels[channel.idx()].push(appender.handler.clone());
                }
            }
            let def = FlowDef {
                key: key.clone(),
                name: raw.name,
                version: raw.version,
                graph,
                max_step_exec_time: raw
                    .max_step_exec_time
                    .map(Duration::from_millis)
                    .unwrap_or(config.max_step_exec_time),
                channels,
                paused: AtomicBool::new(false),
            };
            info!(flow = %key, "loaded flow");
            flows.insert(key, Arc::new(def));
        }
        Self { flows }
    }

    /// Resolve a definition at registration time.
    ///
    /// With an explicit version the key is exact. A bare name resolves when
    /// exactly one version of that flow is loaded; a name already shaped
    /// like `name(version)` is treated as a key.
    pub fn resolve(&self, name: &str, version: Option<&str>) -> Result<Arc<FlowDef>, FlowError> {
        let key = match version {
            Some(v) => flow_key(name, v),
            None if name.ends_with(')') && name.contains('(') => name.to_string(),
            None => {
                let mut found: Option<Arc<FlowDef>> = None;
                for entry in self.flows.iter() {
                    if entry.value().name == name {
                        if found.is_some() {
                            return Err(FlowError::AmbiguousVersion(name.to_string()));
                        }
                        found = Some(entry.value().clone());
                    }
                }
                return found.ok_or_else(|| FlowError::UnknownFlow(name.to_string()));
            }
        };
        self.flows
            .get(&key)
            .map(|def| def.value().clone())
            .ok_or(FlowError::UnknownFlow(key))
    }

    /// Toggle the paused flag on every definition matched by `name`. A
    /// bare flow name matches all loaded versions; a full `name(version)`
    /// key matches one.
    pub fn set_paused(&self, name: &str, paused: bool) {
        for entry in self.flows.iter() {
            let def = entry.value();
            if def.name == name || def.key == name {
                def.set_paused(paused);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
