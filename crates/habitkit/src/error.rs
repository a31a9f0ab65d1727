// crates/habitkit/src/error.rs
// Standardized error types for habitkit

use thiserror::Error;

/// Main error type for the habitkit library
#[derive(Error, Debug)]
pub enum HabitError {
    #[error("store not initialized: open() must finish before use")]
    NotInitialized,

    #[error("habit {habit_id} already completed on {date}")]
    DuplicateCompletion { habit_id: String, date: String },

    #[error("habit not found: {0}")]
    HabitNotFound(String),

    #[error("migration v{version} ({name}) failed: {reason}")]
    MigrationFailed {
        version: u32,
        name: &'static str,
        reason: String,
    },

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

}

/// Convenience type alias for Result using HabitError
pub type Result<T> = std::result::Result<T, HabitError>;

impl HabitError {
    /// Message suitable for showing to the end user, one per error kind.
    pub fn user_message(&self) -> String {
        match self {
            HabitError::NotInitialized => {
                "The habit database is still starting up. Try again in a moment.".to_string()
            }
            HabitError::DuplicateCompletion { date, .. } => {
                format!("Already done for {date}.")
            }
            HabitError::HabitNotFound(_) => {
                "That habit no longer exists. Refresh your habit list.".to_string()
            }
            HabitError::MigrationFailed { .. } => {
                "The habit database could not be upgraded. Your data was not changed.".to_string()
            }
            HabitError::InvalidDate(date) => format!("'{date}' is not a valid date (YYYY-MM-DD)."),
            HabitError::InvalidInput(msg) => format!("Invalid input: {msg}"),
            other => format!("Something went wrong: {other}"),
        }
    }

    /// Whether the caller can recover by refreshing or treating the action as done.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HabitError::DuplicateCompletion { .. }
                | HabitError::HabitNotFound(_)
                | HabitError::InvalidDate(_)
                | HabitError::InvalidInput(_)
        )
    }
}

impl From<deadpool_sqlite::InteractError> for HabitError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        HabitError::Pool(format!("interact failed: {err}"))
    }
}

impl From<deadpool_sqlite::PoolError> for HabitError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        HabitError::Pool(format!("failed to get connection: {err}"))
    }
}
