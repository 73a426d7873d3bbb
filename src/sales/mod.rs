use thiserror::Error;

pub mod dataset;
pub mod transaction;


#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("source is not a readable sales table: {message}")]
    Unreadable {
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    #[error("no transactions left after cleaning ({0})")]
    Empty(EmptyReason),
}

impl LoadError {
    pub fn unreadable(message: impl Into<String>) -> LoadError {
        LoadError::Unreadable {
            message: message.into(),
            cause: None,
        }
    }

    pub fn unreadable_from<E>(message: impl Into<String>, cause: E) -> LoadError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LoadError::Unreadable {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum EmptyReason {
    #[error("source has no rows")]
    NoRows,
    #[error("all {dropped} rows were invalid")]
    AllRowsInvalid { dropped: usize },
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("no sales recorded in {year}")]
pub struct NoDataError {
    pub year: i32,
}
