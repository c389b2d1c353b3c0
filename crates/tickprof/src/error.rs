use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No profiling history stored under key '{key}'")]
    HistoryNotFound { key: String },

    #[error("Tick {tick} is not in the stored history")]
    TickNotFound { tick: u64 },

    #[error("The stored history has no recorded ticks")]
    EmptyHistory,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Trace(#[from] tickprof_trace::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const HISTORY_NOT_FOUND: i32 = 3;
    pub const INCOMPATIBLE_FORMAT: i32 = 4;
    pub const DATABASE_ERROR: i32 = 6;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::HistoryNotFound { .. } | Error::TickNotFound { .. } | Error::EmptyHistory => {
                exit_code::HISTORY_NOT_FOUND
            }
            Error::Database(_) => exit_code::DATABASE_ERROR,
            Error::InvalidArgument(_) => exit_code::INVALID_ARGUMENTS,
            Error::Trace(tickprof_trace::Error::FormatVersion { .. }) => {
                exit_code::INCOMPATIBLE_FORMAT
            }
            _ => exit_code::GENERAL_ERROR,
        }
    }
}
