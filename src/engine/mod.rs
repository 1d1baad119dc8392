// Purpose: block-timing and configuration plumbing shared by the synth layer

pub mod config;
pub mod error;
pub mod queue;

pub use config::{AftertouchMode, EngineConfig, PolyMode};
pub use error::ConfigError;
pub use queue::EventQueue;
