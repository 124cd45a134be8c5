pub mod control;
pub mod engine;
pub mod handle;
pub mod instance;
pub mod reaper;
pub mod registry;
