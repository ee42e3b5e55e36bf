use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The storage engine rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),
    /// The store handle can no longer serve requests (poisoned lock, lost worker).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(e: E) -> Self {
        Self::Backend(e.to_string())
    }

    pub fn unavailable<E: std::fmt::Display>(e: E) -> Self {
        Self::Unavailable(e.to_string())
    }
}
