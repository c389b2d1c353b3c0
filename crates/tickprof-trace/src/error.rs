use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("End(\"{key}\") called with no open span")]
    StackUnderflow { key: String },

    #[error("End(\"{found}\") does not match the open span \"{expected}\"")]
    StackKeyMismatch { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("History format version {found} is not supported (expected {expected})")]
    FormatVersion { found: u32, expected: u32 },

    #[error("Key id {0} is missing from the key map")]
    UnknownKeyId(u32),

    #[error("Root key \"{0}\" does not name a tick")]
    NotATickKey(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Persistence sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an error raised by a `PersistenceSink` implementation.
    pub fn sink(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Sink(err.into())
    }

    /// True for errors caused by unbalanced `begin`/`end` pairs.
    pub fn is_stack_discipline(&self) -> bool {
        matches!(
            self,
            Error::StackUnderflow { .. } | Error::StackKeyMismatch { .. }
        )
    }
}
