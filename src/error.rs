//! Domain error types for meetscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeetscribeError {
    /// A required API key is absent. Raised before any network activity.
    #[error("Missing credential: {0} is not configured (config file or environment)")]
    MissingCredential(&'static str),

    /// A word or event record from the transcription service is missing a
    /// required field. Fatal for the call that consumed it.
    #[error("Malformed word record at index {index}: missing {field}")]
    MalformedInput { index: usize, field: &'static str },

    /// A transcription or summarization request failed.
    #[error("{service} request failed: {message}")]
    ExternalService { service: &'static str, message: String },

    /// A call produced no usable text. Logged and treated as a no-op by
    /// callers that can continue without it.
    #[error("{0} produced no usable text")]
    EmptyResult(&'static str),
}

impl MeetscribeError {
    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }
}
