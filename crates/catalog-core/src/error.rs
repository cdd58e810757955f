use thiserror::Error;

/// Core error types for catalog queries
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid genre id: {0:?}")]
    InvalidGenreId(String),
}

impl CoreError {
    /// Create a new InvalidGenreId error
    pub fn invalid_genre_id(id: impl Into<String>) -> Self {
        Self::InvalidGenreId(id.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidGenreId(_))
    }
}
