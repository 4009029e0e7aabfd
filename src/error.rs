/// An error in a [`MessageTracker`][crate::MessageTracker] operation.
#[derive(thiserror::Error, PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No message with the given ID is retained by the tracker.
    #[error("message not found: {0:?}")]
    NotFound(String),
    #[error("tracker capacity must be positive (got {0})")]
    InvalidCapacity(usize),
}

impl Error {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound(id.to_owned())
    }

    /// Whether this error reports a missing message.
    #[inline]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
