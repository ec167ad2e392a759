use thiserror::Error;

use crate::source::ExtractionError;

// Use .user_error() to put an operator facing explanation into the error chain.
// main() pulls it back out and prints it above the full chain
#[derive(Error, Debug, Clone)]
#[error("{msg}")]
pub struct UserError {
    pub msg: String,
}

impl UserError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

pub trait ToUserError<T> {
    fn user_error(self, msg: impl Into<String>) -> anyhow::Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ToUserError<T> for Result<T, E> {
    fn user_error(self, msg: impl Into<String>) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::Error::from(e).context(UserError::new(msg)))
    }
}

/// Walks the chain for the first explicit `UserError`, falling back to the hint carried by
/// a failed export response.
pub fn get_user_message(error: &anyhow::Error) -> &str {
    for cause in error.chain() {
        if let Some(user_error) = cause.downcast_ref::<UserError>() {
            return &user_error.msg;
        }
        if let Some(ExtractionError::Status { hint, .. }) = cause.downcast_ref::<ExtractionError>()
        {
            return hint;
        }
    }
    "The migration stopped unexpectedly, see the error chain below"
}
