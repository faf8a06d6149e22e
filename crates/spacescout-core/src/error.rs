use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Unreadable content for item '{item_id}': {reason}")]
    UnreadableContent { item_id: String, reason: String },

    #[error("Unknown items referenced: {0:?}")]
    UnknownItem(Vec<String>),

    #[error("Unknown plan id {0}")]
    UnknownPlan(u64),

    #[error("Plan {0} is already finalized")]
    PlanAlreadyFinalized(u64),

    #[error("Similarity index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("{0}")]
    Other(String),
}
