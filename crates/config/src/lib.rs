// Configuration loading

pub mod settings;

pub use settings::{ConfigError, ReasoningEffort, Settings, Verbosity};
