pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod model;
pub mod progress;
pub mod source;

pub use config::EngineConfig;
pub use engine::{CleanupEngine, RefreshOutcome};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
