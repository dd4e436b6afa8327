use thiserror::Error;

/// Misuse of the context stack. Every variant is a programmer error and is
/// reported synchronously to the caller that broke the discipline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// `release` was called on a thread with no established context.
    #[error("release called with no context to release")]
    NothingToRelease,

    /// `release` was called with a context that is not the top of the stack.
    #[error("{context} is not the current context")]
    NotCurrent { context: String },

    /// The active context is not a `MockableAccessorContext`.
    #[error("no MockableAccessorContext established")]
    NoMockableContext,
}

pub type Result<T> = std::result::Result<T, ContextError>;
