use thiserror::Error;

/// Boxed error returned by a [`Connector`](crate::Connector).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can abort registration of the fairing.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Attach(#[from] AttachError),
    #[error("MongoDB state is already exposed by another fairing instance")]
    AlreadyRegistered,
    #[error("this MongoDB fairing instance has already been ignited")]
    AlreadyIgnited,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one connection must be configured")]
    Empty,
    #[error("invalid connection options at index {index}: {message}")]
    Invalid { index: usize, message: String },
    #[error("You cannot mix different types of decorate options")]
    MixedDecorate,
    #[error("decoration `{0}` is configured more than once")]
    DuplicateDecoration(String),
}

/// The driver failed to establish one connection of the batch.
#[derive(Error, Debug)]
#[error("failed to connect to {url}: {source}")]
pub struct ConnectionError {
    /// Redacted connection string.
    pub url: String,
    #[source]
    pub source: BoxError,
}

/// Closing a connection during shutdown failed. Only ever logged.
#[derive(Error, Debug)]
#[error("failed to close MongoDB connection {index}: {source}")]
pub struct CloseError {
    pub index: usize,
    #[source]
    pub source: BoxError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error("decoration `{0}` is already defined")]
    Duplicate(String),
    #[error("decoration registry is not managed by this Rocket instance")]
    Missing,
    #[error("decoration registry lock is poisoned")]
    Poisoned,
}
