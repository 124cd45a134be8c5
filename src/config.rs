use crate::error::FlowError;
use crate::output::{Appender, ChannelType};
use std::sync::Arc;
use std::time::Duration;

/// Attachment filter for one appender. Empty lists mean "any".
#[derive(Debug, Clone, Default)]
pub struct AttachFilter {
    /// Channel types this appender receives.
    pub types: Vec<ChannelType>,
    /// Flow names or `name(version)` keys this appender is attached to.
    pub flows: Vec<String>,
}

impl AttachFilter {
    fn matches_flow(&self, name: &str, key: &str) -> bool {
        self.flows.is_empty()
            || self
                .flows
                .iter()
                .any(|f| f == name || f == key || f == "*")
    }
}

/// One configured sink and the subset of flows/channels it serves.
///
/// Filters are resolved once at load time, when appenders are attached to
/// each flow definition, so dispatch at runtime is a plain per-channel list.
#[derive(Clone)]
pub struct AppenderConfig {
    pub handler: Arc<dyn Appender>,
    pub only_for: Option<AttachFilter>,
    pub not_for: Option<AttachFilter>,
}

impl AppenderConfig {
    pub fn new(handler: Arc<dyn Appender>) -> Self {
        Self {
            handler,
            only_for: None,
            not_for: None,
        }
    }

    pub fn only_for(mut self, filter: AttachFilter) -> Self {
        self.only_for = Some(filter);
        self
    }

    pub fn not_for(mut self, filter: AttachFilter) -> Self {
        self.not_for = Some(filter);
        self
    }

    pub(crate) fn should_attach(&self, name: &str, key: &str) -> bool {
        if let Some(only) = &self.only_for {
            if !only.matches_flow(name, key) {
                return false;
            }
        }
        if let Some(not) = &self.not_for {
            if !not.flows.is_empty() && not.matches_flow(name, key) {
                return false;
            }
        }
        true
    }

    /// Channels this appender subscribes to, defaulting to all four.
    pub(crate) fn channels(&self) -> Vec<ChannelType> {
        let types = self.only_for.as_ref().map(|f| f.types.as_slice());
        match types {
            Some([]) | None => ChannelType::ALL.to_vec(),
            Some(list) => list.to_vec(),
        }
    }
}

pub struct Config {
    pub appenders: Vec<AppenderConfig>,
    /// Default per-step deadline; a flow header may override it.
    pub max_step_exec_time: Duration,
    /// How often the background reaper scans for stalled instances.
    pub reap_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appenders: Vec::new(),
            max_step_exec_time: Duration::from_millis(200),
            reap_interval: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), FlowError> {
        for (i, appender) in self.appenders.iter().enumerate() {
            if appender.only_for.is_some() && appender.not_for.is_some() {
                return Err(FlowError::InvalidConfig(format!(
                    "appender {i} has both only_for and not_for filters"
                )));
            }
        }
        Ok(())
    }
}
