//! Command implementations

pub mod cat;
pub mod delete;
pub mod format;
pub mod list;
pub mod store;

/// Errors surfaced by command implementations
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The store rejected the operation
    #[error("store error: {0}")]
    Store(#[from] flashfat_core::Error),

    /// Host-side file I/O failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
