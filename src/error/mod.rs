use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("pipeline error: {context}")]
    Pipeline { context: &'static str },

    #[error("stage {stage}: {context}")]
    Stage { stage: &'static str, context: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn pipeline(context: &'static str) -> Self {
        Self::Pipeline { context }
    }

    pub fn stage(stage: &'static str, context: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            context: context.into(),
        }
    }
}
