//! Error types for the parallel batch iterator

use thiserror::Error;

/// Error type for the parallel batch iterator
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] ml_batch_core::Error),

    /// The worker pool could not be built
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The worker pool was shut down
    #[error("Worker pool has been shut down")]
    PoolShutdown,

    /// A query needed a batch but the source holds no records
    #[error("No data: {0}")]
    NoData(&'static str),
}

impl Error {
    /// Whether this error must abort a batch regardless of the skip policy
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Core(error) => error.is_fatal(),
            Error::ThreadPool(_) | Error::PoolShutdown | Error::NoData(_) => true,
        }
    }
}

/// Result type for the parallel batch iterator
pub type Result<T> = std::result::Result<T, Error>;
