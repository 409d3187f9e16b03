use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Skill already exists: {0}")]
    DuplicateSkill(String),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RecallError>;
