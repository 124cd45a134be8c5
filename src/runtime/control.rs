use dashmap::DashSet;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Side-channel dispatch types that can be muted at runtime. These are the
/// user-facing log calls; head acknowledgements, flow-completion records
/// and engine-raised errors are never muted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideChannel {
    Data,
    Warn,
    Error,
    Trace,
}

impl SideChannel {
    fn idx(&self) -> usize {
        match self {
            SideChannel::Data => 0,
            SideChannel::Warn => 1,
            SideChannel::Error => 2,
            SideChannel::Trace => 3,
        }
    }
}

/// Argument to `pause`/`play`: the tags, flows and dispatch types to
/// toggle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub keys: Vec<String>,
    /// Flow names or full `name(version)` keys. A bare name toggles every
    /// loaded version of that flow; a keyed entry toggles exactly one.
    #[serde(default)]
    pub flows: Vec<String>,
    #[serde(default)]
    pub types: Vec<SideChannel>,
}

/// Runtime mute state for tags and dispatch types.
///
/// Each side-channel type is a single atomic gate checked once per call,
/// rather than a swapped handler. Every tag starts active; pausing a key
/// adds it to the muted set. Flow-level pausing lives on the flow
/// definition itself, and all three axes must pass for a record to be
/// emitted.
#[derive(Default)]
pub struct ControlPlane {
    muted_keys: DashSet<String>,
    gates: [AtomicBool; 4],
}

impl ControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when calls of this dispatch type are currently emitted.
    pub fn channel_enabled(&self, channel: SideChannel) -> bool {
        !self.gates[channel.idx()].load(Ordering::Relaxed)
    }

    /// True when a call carrying `tag` passes the tag filter.
    pub fn tag_enabled(&self, tag: Option<&str>) -> bool {
        tag.is_none_or(|t| !self.muted_keys.contains(t))
    }

    pub fn pause_keys(&self, keys: &[String]) {
        for key in keys {
            self.muted_keys.insert(key.clone());
        }
    }

    pub fn play_keys(&self, keys: &[String]) {
        for key in keys {
            self.muted_keys.remove(key);
        }
    }

    pub fn pause_types(&self, types: &[SideChannel]) {
        for t in types {
            self.gates[t.idx()].store(true, Ordering::Relaxed);
        }
    }

    pub fn play_types(&self, types: &[SideChannel]) {
        for t in types {
            self.gates[t.idx()].store(false, Ordering::Relaxed);
        }
    }
}
