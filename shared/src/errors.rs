//! Shared error types for the realtime console client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid feed name: {input}")]
    InvalidFeedName { input: String },
}

impl From<serde_json::Error> for SharedError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_data() || error.is_syntax() || error.is_eof() {
            SharedError::DeserializationError { message: error.to_string() }
        } else {
            SharedError::SerializationError { message: error.to_string() }
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
